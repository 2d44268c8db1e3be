//! Service API handlers.
//!
//! The producer-facing surface: business services enqueue events over HTTP
//! when they do not share the database. Producers that do share it should
//! insert through `outpost_core::entities::outbox_events::OutboxEvent::insert_tx`
//! inside their own transaction instead.

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use outpost_core::entities::outbox_events::NewOutboxEvent;
use outpost_core::store::{EventStore, StoreError};
use outpost_sdk::objects::events::{EnqueueEventRequest, EnqueueEventResponse};

use crate::state::AppState;

/// Build the Service API router.
pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(enqueue_event))
}

/// Errors that can occur in Service API handlers.
#[derive(Debug)]
pub(crate) enum ServiceApiError {
    Store(StoreError),
    InvalidMaxRetries(i32),
}

impl From<StoreError> for ServiceApiError {
    fn from(err: StoreError) -> Self {
        ServiceApiError::Store(err)
    }
}

impl IntoResponse for ServiceApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ServiceApiError::Store(e) => {
                tracing::error!(error = %e, "Service API store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            ServiceApiError::InvalidMaxRetries(value) => (
                StatusCode::BAD_REQUEST,
                format!("max_retries must be >= 0, got {value}"),
            )
                .into_response(),
        }
    }
}

/// `POST /events` – durably enqueue an event for delivery.
pub async fn enqueue_event(
    state: axum::extract::State<AppState>,
    Json(request): Json<EnqueueEventRequest>,
) -> Result<impl IntoResponse, ServiceApiError> {
    if request.max_retries < 0 {
        return Err(ServiceApiError::InvalidMaxRetries(request.max_retries));
    }

    let event = state
        .store
        .insert(NewOutboxEvent {
            event_type: request.event_type,
            payload: request.payload,
            max_retries: request.max_retries,
        })
        .await?;

    tracing::debug!(
        event_id = %event.event_id,
        event_type = %event.event_type,
        "event enqueued"
    );
    Ok((
        StatusCode::CREATED,
        Json(EnqueueEventResponse {
            event_id: event.event_id,
        }),
    ))
}
