use axum::{Json, extract::Path, response::IntoResponse};
use outpost_core::store::EventStore;
use uuid::Uuid;

use crate::state::AppState;

use super::{AdminApiError, event_to_admin_response};

/// `GET /events/{event_id}` – fetch a single event.
pub async fn get_event(
    state: axum::extract::State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let event = state
        .store
        .get(event_id)
        .await?
        .ok_or(AdminApiError::NotFound(event_id))?;

    Ok(Json(event_to_admin_response(&event)))
}
