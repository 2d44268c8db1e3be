//! The dispatch engine.
//!
//! A dispatcher polls the store on a fixed interval, claims a batch of due
//! events, attempts delivery of each, and persists the outcome. It keeps no
//! state between polls: any number of dispatchers may run against the same
//! store, coordinated only by the store's atomic claim.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::delivery::DeliveryClient;
use crate::entities::outbox_events::OutboxEvent;
use crate::retry::RetryPolicy;
use crate::store::{EventStore, StoreError};

/// Tuning knobs for the dispatch loop.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum events claimed per poll.
    pub batch_size: i64,
    /// Sleep between polls.
    pub poll_interval: Duration,
    /// Per-attempt delivery timeout; expiry counts as a failed attempt.
    pub delivery_timeout: Duration,
    /// Backoff schedule for failed events.
    pub retry: RetryPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            poll_interval: Duration::from_secs(5),
            delivery_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome counts for one drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Claims due events, attempts delivery, persists the outcome.
pub struct Dispatcher<S, C> {
    store: Arc<S>,
    client: Arc<C>,
    config: DispatcherConfig,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S, C> Dispatcher<S, C>
where
    S: EventStore + 'static,
    C: DeliveryClient + 'static,
{
    pub fn new(
        store: Arc<S>,
        client: Arc<C>,
        config: DispatcherConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            client,
            config,
            shutdown_rx,
        }
    }

    /// Run the dispatch loop until shutdown is signalled.
    pub async fn run(mut self) {
        info!("dispatcher started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("dispatcher received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    match self.drain_once().await {
                        Ok(stats) if stats.claimed > 0 => {
                            debug!(
                                claimed = stats.claimed,
                                sent = stats.sent,
                                failed = stats.failed,
                                "drain pass complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "drain pass failed");
                        }
                    }
                }
            }
        }

        info!("dispatcher shutdown complete");
    }

    /// One poll: claim a batch and attempt every claimed event.
    ///
    /// Attempts run concurrently, each bounded by its own timeout, so one
    /// stalled destination cannot stall the whole batch. Delivery failures
    /// are folded into the event's state; only store errors propagate.
    pub async fn drain_once(&self) -> Result<DrainStats, StoreError> {
        let now = OffsetDateTime::now_utc();
        let claimed = self
            .store
            .claim_batch(self.config.batch_size, now, &self.config.retry)
            .await?;

        let mut stats = DrainStats {
            claimed: claimed.len(),
            ..DrainStats::default()
        };

        let outcomes = join_all(claimed.iter().map(|event| self.attempt(event))).await;
        for outcome in outcomes {
            if outcome? {
                stats.sent += 1;
            } else {
                stats.failed += 1;
            }
        }
        Ok(stats)
    }

    /// Attempt one delivery; returns whether the event was marked sent.
    async fn attempt(&self, event: &OutboxEvent) -> Result<bool, StoreError> {
        let result = tokio::time::timeout(
            self.config.delivery_timeout,
            self.client.send(&event.event_type, &event.payload),
        )
        .await;

        match result {
            Ok(Ok(())) => {
                self.store.mark_sent(event.event_id).await?;
                info!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    retry_count = event.retry_count,
                    "event delivered"
                );
                Ok(true)
            }
            Ok(Err(e)) => {
                warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    error = %e,
                    retry_count = event.retry_count,
                    "delivery failed"
                );
                self.store
                    .mark_failed(event.event_id, &e.to_string())
                    .await?;
                Ok(false)
            }
            Err(_) => {
                let detail = format!(
                    "delivery timed out after {:?}",
                    self.config.delivery_timeout
                );
                warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    retry_count = event.retry_count,
                    "delivery timed out"
                );
                self.store.mark_failed(event.event_id, &detail).await?;
                Ok(false)
            }
        }
    }
}
