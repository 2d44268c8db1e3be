//! Postgres-backed event store.

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::EventStatus;
use crate::entities::outbox_events::{NewOutboxEvent, OutboxEvent};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::store::{EventFilter, EventPage, EventStore, StoreError};

/// Event store over the `outbox_events` table.
///
/// Cloneable and cheap to pass around (the pool is internally shared).
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Resolve a CAS miss into the right error: the row is either gone or
    /// in a status that does not permit the operation.
    async fn explain_miss(&self, event_id: Uuid, operation: &'static str) -> StoreError {
        match OutboxEvent::get_by_id(&self.pool, event_id).await {
            Ok(None) => StoreError::NotFound(event_id),
            Ok(Some(row)) => StoreError::IllegalState {
                id: event_id,
                status: row.status,
                operation,
            },
            Err(e) => StoreError::Database(e),
        }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert(&self, new: NewOutboxEvent) -> Result<OutboxEvent, StoreError> {
        Ok(OutboxEvent::insert(&self.pool, &new).await?)
    }

    async fn claim_batch(
        &self,
        limit: i64,
        now: OffsetDateTime,
        policy: &RetryPolicy,
    ) -> Result<Vec<OutboxEvent>, StoreError> {
        let candidates = OutboxEvent::claim_candidates(&self.pool, limit).await?;

        let mut claimed = Vec::with_capacity(candidates.len());
        for event in candidates {
            let eligible = match event.status {
                // A fresh event always gets its first attempt, even with
                // max_retries = 0 (the cap bounds retries, not attempts).
                EventStatus::New => true,
                EventStatus::Failed => matches!(
                    policy.assess(
                        event.retry_count,
                        event.max_retries,
                        Some(event.updated_at),
                        now,
                    ),
                    RetryDecision::Eligible
                ),
                EventStatus::Processing | EventStatus::Sent => false,
            };
            if !eligible {
                continue;
            }

            // CAS on the status we just read; a concurrent claimer winning
            // the race is a no-op for us, not an error.
            if let Some(row) = OutboxEvent::try_claim(&self.pool, event.event_id, event.status).await? {
                claimed.push(row);
            }
        }
        Ok(claimed)
    }

    async fn mark_sent(&self, event_id: Uuid) -> Result<(), StoreError> {
        if OutboxEvent::mark_sent(&self.pool, event_id).await? {
            return Ok(());
        }
        Err(self.explain_miss(event_id, "mark sent").await)
    }

    async fn mark_failed(&self, event_id: Uuid, error: &str) -> Result<(), StoreError> {
        if OutboxEvent::mark_failed(&self.pool, event_id, error).await? {
            return Ok(());
        }
        Err(self.explain_miss(event_id, "mark failed").await)
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<OutboxEvent>, StoreError> {
        Ok(OutboxEvent::get_by_id(&self.pool, event_id).await?)
    }

    async fn list(&self, filter: &EventFilter) -> Result<EventPage, StoreError> {
        let events = OutboxEvent::list(
            &self.pool,
            filter.status,
            filter.event_type.as_deref(),
            filter.limit,
            filter.offset,
        )
        .await?;
        let total =
            OutboxEvent::count(&self.pool, filter.status, filter.event_type.as_deref()).await?;
        Ok(EventPage { events, total })
    }

    async fn requeue(&self, event_id: Uuid) -> Result<OutboxEvent, StoreError> {
        if let Some(row) = OutboxEvent::requeue(&self.pool, event_id).await? {
            return Ok(row);
        }
        Err(self.explain_miss(event_id, "retry").await)
    }

    async fn delete(&self, event_id: Uuid) -> Result<(), StoreError> {
        if OutboxEvent::delete(&self.pool, event_id).await? {
            return Ok(());
        }
        Err(self.explain_miss(event_id, "delete").await)
    }
}
