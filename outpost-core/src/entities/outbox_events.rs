use crate::entities::EventStatus;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

/// One row of the `outbox_events` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OutboxEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: EventStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub last_error: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub sent_at: Option<OffsetDateTime>,
}

/// Data for inserting a new outbox event.
#[derive(Debug, Clone)]
pub struct NewOutboxEvent {
    pub event_type: String,
    pub payload: serde_json::Value,
    pub max_retries: i32,
}

const COLUMNS: &str = "event_id, event_type, payload, status, retry_count, max_retries, \
                       last_error, created_at, updated_at, sent_at";

impl OutboxEvent {
    /// Insert a new event in `new` state. Event ids are UUIDv7, so they sort
    /// by assignment order.
    pub async fn insert(pool: &PgPool, new: &NewOutboxEvent) -> Result<OutboxEvent, sqlx::Error> {
        let sql = format!(
            "INSERT INTO outbox_events (event_id, event_type, payload, max_retries) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OutboxEvent>(&sql)
            .bind(Uuid::now_v7())
            .bind(&new.event_type)
            .bind(&new.payload)
            .bind(new.max_retries.max(0))
            .fetch_one(pool)
            .await
    }

    /// Insert within a caller-owned transaction, so the event commits
    /// atomically with the business write that produced it.
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        new: &NewOutboxEvent,
    ) -> Result<OutboxEvent, sqlx::Error> {
        let sql = format!(
            "INSERT INTO outbox_events (event_id, event_type, payload, max_retries) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OutboxEvent>(&sql)
            .bind(Uuid::now_v7())
            .bind(&new.event_type)
            .bind(&new.payload)
            .bind(new.max_retries.max(0))
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn get_by_id(
        pool: &PgPool,
        event_id: Uuid,
    ) -> Result<Option<OutboxEvent>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM outbox_events WHERE event_id = $1");
        sqlx::query_as::<_, OutboxEvent>(&sql)
            .bind(event_id)
            .fetch_optional(pool)
            .await
    }

    /// Rows that could be eligible for claiming: fresh rows plus failed rows
    /// still under their retry cap, oldest first. Backoff filtering happens
    /// in the caller, which knows the retry policy.
    pub async fn claim_candidates(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<OutboxEvent>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM outbox_events \
             WHERE status = 'new' OR (status = 'failed' AND retry_count < max_retries) \
             ORDER BY created_at ASC \
             LIMIT $1"
        );
        sqlx::query_as::<_, OutboxEvent>(&sql)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Compare-and-swap claim: transition to `processing` only if the row
    /// still has the status the caller read. Returns `None` when another
    /// worker won the race.
    pub async fn try_claim(
        pool: &PgPool,
        event_id: Uuid,
        expected: EventStatus,
    ) -> Result<Option<OutboxEvent>, sqlx::Error> {
        let sql = format!(
            "UPDATE outbox_events \
             SET status = 'processing', updated_at = now() \
             WHERE event_id = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OutboxEvent>(&sql)
            .bind(event_id)
            .bind(expected)
            .fetch_optional(pool)
            .await
    }

    /// Record a successful delivery. Only legal from `processing`; returns
    /// whether the row was updated.
    pub async fn mark_sent(pool: &PgPool, event_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE outbox_events \
             SET status = 'sent', sent_at = now(), updated_at = now() \
             WHERE event_id = $1 AND status = 'processing'",
        )
        .bind(event_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failed delivery attempt. The retry count saturates at
    /// `max_retries` so a manually forced attempt past the cap cannot break
    /// the `retry_count <= max_retries` invariant.
    pub async fn mark_failed(
        pool: &PgPool,
        event_id: Uuid,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE outbox_events \
             SET status = 'failed', \
                 retry_count = LEAST(retry_count + 1, max_retries), \
                 last_error = $2, \
                 updated_at = now() \
             WHERE event_id = $1 AND status = 'processing'",
        )
        .bind(event_id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Manual retry: force a failed event back to `new` regardless of its
    /// retry count. The retry count is deliberately left untouched.
    pub async fn requeue(
        pool: &PgPool,
        event_id: Uuid,
    ) -> Result<Option<OutboxEvent>, sqlx::Error> {
        let sql = format!(
            "UPDATE outbox_events \
             SET status = 'new', updated_at = now() \
             WHERE event_id = $1 AND status = 'failed' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OutboxEvent>(&sql)
            .bind(event_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete an event. Only legal from `sent` or `failed`; `new` and
    /// `processing` rows hold undelivered work. Returns whether a row was
    /// deleted.
    pub async fn delete(pool: &PgPool, event_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM outbox_events \
             WHERE event_id = $1 AND status IN ('sent', 'failed')",
        )
        .bind(event_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List events with optional status/type filters, newest first.
    pub async fn list(
        pool: &PgPool,
        status: Option<EventStatus>,
        event_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OutboxEvent>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM outbox_events \
             WHERE ($1::event_status IS NULL OR status = $1) \
               AND ($2::text IS NULL OR event_type = $2) \
             ORDER BY created_at DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, OutboxEvent>(&sql)
            .bind(status)
            .bind(event_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count events matching the same filters as [`OutboxEvent::list`].
    pub async fn count(
        pool: &PgPool,
        status: Option<EventStatus>,
        event_type: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM outbox_events \
             WHERE ($1::event_status IS NULL OR status = $1) \
               AND ($2::text IS NULL OR event_type = $2)",
        )
        .bind(status)
        .bind(event_type)
        .fetch_one(pool)
        .await
    }
}
