//! End-to-end lifecycle tests: dispatcher + retry policy + in-memory store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;

use outpost_core::delivery::{DeliveryClient, DeliveryError, ScriptedDeliveryClient};
use outpost_core::dispatcher::{Dispatcher, DispatcherConfig};
use outpost_core::entities::EventStatus;
use outpost_core::entities::outbox_events::NewOutboxEvent;
use outpost_core::retry::RetryPolicy;
use outpost_core::store::{EventStore, MemoryEventStore};

fn no_backoff() -> RetryPolicy {
    RetryPolicy {
        base: time::Duration::ZERO,
        ..RetryPolicy::default()
    }
}

fn config() -> DispatcherConfig {
    DispatcherConfig {
        batch_size: 16,
        poll_interval: Duration::from_millis(10),
        delivery_timeout: Duration::from_millis(250),
        retry: no_backoff(),
    }
}

fn dispatcher<C: DeliveryClient + 'static>(
    store: Arc<MemoryEventStore>,
    client: Arc<C>,
) -> Dispatcher<MemoryEventStore, C> {
    let (_tx, rx) = watch::channel(false);
    Dispatcher::new(store, client, config(), rx)
}

fn booking_confirmed(max_retries: i32) -> NewOutboxEvent {
    NewOutboxEvent {
        event_type: "BOOKING_CONFIRMED".to_string(),
        payload: json!({"booking_id": "bk-201", "total": "149.00"}),
        max_retries,
    }
}

/// A delivery client that never completes within any reasonable timeout.
struct HangingDeliveryClient;

#[async_trait]
impl DeliveryClient for HangingDeliveryClient {
    async fn send(&self, _: &str, _: &serde_json::Value) -> Result<(), DeliveryError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

#[tokio::test]
async fn fails_twice_then_succeeds() {
    let store = Arc::new(MemoryEventStore::new());
    let client = Arc::new(ScriptedDeliveryClient::with_outcomes([
        Err("connection refused".to_string()),
        Err("destination returned status 503: try later".to_string()),
        Ok(()),
    ]));
    let dispatcher = dispatcher(store.clone(), client.clone());

    let event = store.insert(booking_confirmed(3)).await.unwrap();

    for _ in 0..3 {
        dispatcher.drain_once().await.unwrap();
    }

    let row = store.get(event.event_id).await.unwrap().unwrap();
    assert_eq!(row.status, EventStatus::Sent);
    assert_eq!(row.retry_count, 2);
    // last_error keeps the final failure detail even after success.
    assert_eq!(
        row.last_error.as_deref(),
        Some("destination returned status 503: try later")
    );
    assert!(row.sent_at.is_some());
    assert_eq!(client.attempt_count().await, 3);

    // Sent events are never picked up again.
    let stats = dispatcher.drain_once().await.unwrap();
    assert_eq!(stats.claimed, 0);
}

#[tokio::test]
async fn retry_exhaustion_parks_the_event_in_failed() {
    let store = Arc::new(MemoryEventStore::new());
    let client = Arc::new(ScriptedDeliveryClient::with_outcomes([
        Err("boom 1".to_string()),
        Err("boom 2".to_string()),
        Err("boom 3".to_string()),
    ]));
    let dispatcher = dispatcher(store.clone(), client.clone());

    let event = store.insert(booking_confirmed(2)).await.unwrap();

    for _ in 0..5 {
        dispatcher.drain_once().await.unwrap();
    }

    // Two failures exhaust a cap of 2; the dead event is idempotent under
    // further polls.
    let row = store.get(event.event_id).await.unwrap().unwrap();
    assert_eq!(row.status, EventStatus::Failed);
    assert_eq!(row.retry_count, 2);
    assert_eq!(row.last_error.as_deref(), Some("boom 2"));
    assert_eq!(row.sent_at, None);
    assert_eq!(client.attempt_count().await, 2);
}

#[tokio::test]
async fn manual_retry_past_the_cap_can_reach_sent() {
    let store = Arc::new(MemoryEventStore::new());
    let client = Arc::new(ScriptedDeliveryClient::with_outcomes([
        Err("boom 1".to_string()),
        Err("boom 2".to_string()),
        Ok(()),
    ]));
    let dispatcher = dispatcher(store.clone(), client.clone());

    let event = store.insert(booking_confirmed(2)).await.unwrap();

    for _ in 0..4 {
        dispatcher.drain_once().await.unwrap();
    }
    let row = store.get(event.event_id).await.unwrap().unwrap();
    assert_eq!(row.status, EventStatus::Failed);
    assert_eq!(row.retry_count, 2);

    // The operator override: requeue a dead event without touching its
    // retry count.
    let requeued = store.requeue(event.event_id).await.unwrap();
    assert_eq!(requeued.status, EventStatus::New);
    assert_eq!(requeued.retry_count, 2);

    dispatcher.drain_once().await.unwrap();

    let row = store.get(event.event_id).await.unwrap().unwrap();
    assert_eq!(row.status, EventStatus::Sent);
    assert_eq!(row.retry_count, 2);
    assert!(row.sent_at.is_some());
    assert_eq!(client.attempt_count().await, 3);
}

#[tokio::test]
async fn forced_retry_that_fails_again_re_exhausts_immediately() {
    let store = Arc::new(MemoryEventStore::new());
    let client = Arc::new(ScriptedDeliveryClient::with_outcomes([
        Err("boom 1".to_string()),
        Err("boom 2".to_string()),
    ]));
    let dispatcher = dispatcher(store.clone(), client.clone());

    let event = store.insert(booking_confirmed(1)).await.unwrap();

    dispatcher.drain_once().await.unwrap();
    let row = store.get(event.event_id).await.unwrap().unwrap();
    assert_eq!((row.status, row.retry_count), (EventStatus::Failed, 1));

    store.requeue(event.event_id).await.unwrap();
    dispatcher.drain_once().await.unwrap();

    // The second failure saturates instead of exceeding the cap.
    let row = store.get(event.event_id).await.unwrap().unwrap();
    assert_eq!(row.status, EventStatus::Failed);
    assert_eq!(row.retry_count, 1);
    assert_eq!(row.last_error.as_deref(), Some("boom 2"));
    assert!(row.retry_count <= row.max_retries);
}

#[tokio::test]
async fn delivery_timeout_counts_as_failure() {
    let store = Arc::new(MemoryEventStore::new());
    let client = Arc::new(HangingDeliveryClient);
    let dispatcher = dispatcher(store.clone(), client);

    let event = store.insert(booking_confirmed(3)).await.unwrap();

    let stats = dispatcher.drain_once().await.unwrap();
    assert_eq!(stats.claimed, 1);
    assert_eq!(stats.failed, 1);

    let row = store.get(event.event_id).await.unwrap().unwrap();
    assert_eq!(row.status, EventStatus::Failed);
    assert_eq!(row.retry_count, 1);
    let last_error = row.last_error.unwrap();
    assert!(last_error.contains("timed out"), "got: {last_error}");
}

#[tokio::test]
async fn one_slow_delivery_does_not_stall_the_batch() {
    let store = Arc::new(MemoryEventStore::new());
    let slow = store
        .insert(NewOutboxEvent {
            event_type: "SLOW_DESTINATION".to_string(),
            payload: json!({}),
            max_retries: 0,
        })
        .await
        .unwrap();
    let fast = store.insert(booking_confirmed(3)).await.unwrap();

    // Hangs on the slow type, succeeds immediately on everything else.
    struct MixedClient;

    #[async_trait]
    impl DeliveryClient for MixedClient {
        async fn send(
            &self,
            event_type: &str,
            _: &serde_json::Value,
        ) -> Result<(), DeliveryError> {
            if event_type == "SLOW_DESTINATION" {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(())
        }
    }

    let dispatcher = dispatcher(store.clone(), Arc::new(MixedClient));

    let started = std::time::Instant::now();
    let stats = dispatcher.drain_once().await.unwrap();
    assert_eq!(stats.claimed, 2);
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.failed, 1);
    // Bounded by one attempt timeout, not the hang: attempts run
    // concurrently and each carries its own timeout.
    assert!(started.elapsed() < Duration::from_secs(5));

    let row = store.get(fast.event_id).await.unwrap().unwrap();
    assert_eq!(row.status, EventStatus::Sent);
    let row = store.get(slow.event_id).await.unwrap().unwrap();
    assert_eq!(row.status, EventStatus::Failed);
}

#[tokio::test]
async fn sent_at_is_set_exactly_when_sent() {
    let store = Arc::new(MemoryEventStore::new());
    let client = Arc::new(ScriptedDeliveryClient::with_outcomes([
        Err("nope".to_string()),
        Ok(()),
    ]));
    let dispatcher = dispatcher(store.clone(), client);

    let event = store.insert(booking_confirmed(3)).await.unwrap();

    dispatcher.drain_once().await.unwrap();
    let row = store.get(event.event_id).await.unwrap().unwrap();
    assert_eq!(row.status, EventStatus::Failed);
    assert_eq!(row.sent_at, None);

    dispatcher.drain_once().await.unwrap();
    let row = store.get(event.event_id).await.unwrap().unwrap();
    assert_eq!(row.status, EventStatus::Sent);
    assert!(row.sent_at.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claimers_never_share_an_event() {
    const EVENTS: usize = 120;
    const CLAIMERS: usize = 8;

    let store = Arc::new(MemoryEventStore::new());
    for i in 0..EVENTS {
        store
            .insert(NewOutboxEvent {
                event_type: "ORDER_CREATED".to_string(),
                payload: json!({"n": i}),
                max_retries: 3,
            })
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..CLAIMERS {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let policy = RetryPolicy::default();
            let mut mine = Vec::new();
            loop {
                let claimed = store
                    .claim_batch(7, time::OffsetDateTime::now_utc(), &policy)
                    .await
                    .unwrap();
                if claimed.is_empty() {
                    break;
                }
                mine.extend(claimed.into_iter().map(|e| e.event_id));
                tokio::time::sleep(Duration::from_micros(fastrand::u64(0..500))).await;
            }
            mine
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }

    let unique: std::collections::HashSet<_> = all.iter().copied().collect();
    assert_eq!(all.len(), unique.len(), "an event was claimed twice");
    assert_eq!(all.len(), EVENTS, "claimed union must cover every event");
}
