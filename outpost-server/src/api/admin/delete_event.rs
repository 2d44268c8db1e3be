use axum::{extract::Path, http::StatusCode, response::IntoResponse};
use outpost_core::store::EventStore;
use uuid::Uuid;

use crate::state::AppState;

use super::AdminApiError;

/// `DELETE /events/{event_id}` – delete a sent or failed event.
///
/// Rejected for `new` and `processing` events: those still hold
/// undelivered or in-flight work.
pub async fn delete_event(
    state: axum::extract::State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    state.store.delete(event_id).await?;

    tracing::info!(event_id = %event_id, "event deleted");
    Ok(StatusCode::NO_CONTENT)
}
