//! The event store: single source of truth for event state.
//!
//! Every write to `status`, `retry_count`, `last_error`, and `sent_at` goes
//! through this contract, and the lifecycle legality rules live here rather
//! than in API handlers, so no caller can bypass the state machine.

pub mod memory;
pub mod postgres;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::EventStatus;
use crate::entities::outbox_events::{NewOutboxEvent, OutboxEvent};
use crate::retry::RetryPolicy;

/// Errors from event store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No event with the given id exists.
    #[error("event not found: {0}")]
    NotFound(Uuid),

    /// The event's current status does not permit the operation.
    #[error("event {id} is {status}, cannot {operation}")]
    IllegalState {
        id: Uuid,
        status: EventStatus,
        operation: &'static str,
    },
}

/// Filter and pagination for listing events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub event_type: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// A page of events plus the total number of matching rows.
#[derive(Debug, Clone)]
pub struct EventPage {
    pub events: Vec<OutboxEvent>,
    pub total: i64,
}

/// Durable storage contract for outbox events.
///
/// `claim_batch` is the coordination point between dispatcher workers: it
/// must transition eligible rows to `processing` with a compare-and-swap
/// conditioned on the previously-read status, so two concurrent workers can
/// never claim the same row. The loser of a claim race gets nothing for
/// that row and moves on.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a new event in `new` state and assign its id.
    async fn insert(&self, new: NewOutboxEvent) -> Result<OutboxEvent, StoreError>;

    /// Atomically claim up to `limit` due events, oldest first: rows in
    /// `new`, plus rows in `failed` that are under their retry cap and past
    /// the policy's backoff window. Claimed rows are `processing` on return.
    /// Rows already in `processing` are never reclaimed.
    async fn claim_batch(
        &self,
        limit: i64,
        now: OffsetDateTime,
        policy: &RetryPolicy,
    ) -> Result<Vec<OutboxEvent>, StoreError>;

    /// Record a successful delivery: `processing` → `sent`, setting
    /// `sent_at`. `last_error` is left untouched.
    async fn mark_sent(&self, event_id: Uuid) -> Result<(), StoreError>;

    /// Record a failed delivery attempt: `processing` → `failed`,
    /// incrementing `retry_count` (saturating at `max_retries`) and
    /// overwriting `last_error`.
    async fn mark_failed(&self, event_id: Uuid, error: &str) -> Result<(), StoreError>;

    async fn get(&self, event_id: Uuid) -> Result<Option<OutboxEvent>, StoreError>;

    async fn list(&self, filter: &EventFilter) -> Result<EventPage, StoreError>;

    /// Manual retry: `failed` → `new`, regardless of the retry cap, without
    /// resetting `retry_count`. Rejected for every other status: there is
    /// nothing to retry about a `new`, `processing`, or `sent` event.
    async fn requeue(&self, event_id: Uuid) -> Result<OutboxEvent, StoreError>;

    /// Delete an event. Legal only from `sent` or `failed`; deleting `new`
    /// or `processing` rows would drop undelivered or in-flight work.
    async fn delete(&self, event_id: Uuid) -> Result<(), StoreError>;
}
