use axum::{Json, extract::Path, response::IntoResponse};
use outpost_core::store::EventStore;
use uuid::Uuid;

use crate::state::AppState;

use super::{AdminApiError, event_to_admin_response};

/// `POST /events/{event_id}/retry` – re-queue a failed event for delivery.
///
/// Legal only when the event is `failed`. Deliberately ignores the retry
/// cap and leaves `retry_count` untouched: this is the operator's escape
/// hatch for dead events, so a forced attempt that fails again immediately
/// re-exhausts the event.
pub async fn retry_event(
    state: axum::extract::State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let event = state.store.requeue(event_id).await?;

    tracing::info!(
        event_id = %event.event_id,
        retry_count = event.retry_count,
        "event manually re-queued"
    );
    Ok(Json(event_to_admin_response(&event)))
}
