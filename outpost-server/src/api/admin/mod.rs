//! Admin API handlers.
//!
//! These endpoints are called by the operator console. They never bypass
//! the event lifecycle rules: illegal operations are rejected by the store
//! and surface here as `409 Conflict`.
//!
//! # Endpoints
//!
//! - `GET    /events`                    – list events (paginated, filterable)
//! - `GET    /events/{event_id}`         – fetch one event
//! - `POST   /events/{event_id}/retry`   – re-queue a failed event
//! - `DELETE /events/{event_id}`         – delete a sent or failed event
//! - `POST   /events/bulk-retry`         – retry many, per-id outcomes
//! - `POST   /events/bulk-delete`        – delete many, per-id outcomes

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::state::AppState;

mod bulk_delete;
mod bulk_retry;
mod delete_event;
mod get_event;
mod list_events;
mod retry_event;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events::list_events))
        .route(
            "/events/{event_id}",
            get(get_event::get_event).delete(delete_event::delete_event),
        )
        .route(
            "/events/{event_id}/retry",
            post(retry_event::retry_event),
        )
        .route("/events/bulk-retry", post(bulk_retry::bulk_retry))
        .route("/events/bulk-delete", post(bulk_delete::bulk_delete))
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

use outpost_core::entities::EventStatus;
use outpost_core::store::StoreError;

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Database(sqlx::Error),
    NotFound(Uuid),
    IllegalState {
        id: Uuid,
        status: EventStatus,
        operation: &'static str,
    },
}

impl From<StoreError> for AdminApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AdminApiError::Database(e),
            StoreError::NotFound(id) => AdminApiError::NotFound(id),
            StoreError::IllegalState {
                id,
                status,
                operation,
            } => AdminApiError::IllegalState {
                id,
                status,
                operation,
            },
        }
    }
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::Database(e) => {
                tracing::error!(error = %e, "Admin API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            AdminApiError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "event not found").into_response()
            }
            AdminApiError::IllegalState {
                id,
                status,
                operation,
            } => (
                StatusCode::CONFLICT,
                format!("event {id} is {status}, cannot {operation}"),
            )
                .into_response(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

use outpost_core::entities::outbox_events::OutboxEvent;
use outpost_sdk::objects::events::AdminEventResponse;

pub(crate) fn event_to_admin_response(e: &OutboxEvent) -> AdminEventResponse {
    AdminEventResponse {
        event_id: e.event_id,
        event_type: e.event_type.clone(),
        payload: e.payload.clone(),
        status: e.status.into(),
        retry_count: e.retry_count,
        max_retries: e.max_retries,
        last_error: e.last_error.clone(),
        created_at: e.created_at.unix_timestamp(),
        updated_at: e.updated_at.unix_timestamp(),
        sent_at: e.sent_at.map(|t| t.unix_timestamp()),
    }
}
