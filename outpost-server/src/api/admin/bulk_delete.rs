use axum::{Json, response::IntoResponse};
use outpost_core::store::{EventStore, StoreError};
use outpost_sdk::objects::events::{BulkEventRequest, BulkEventResponse, BulkItemOutcome};

use crate::state::AppState;

use super::AdminApiError;

/// `POST /events/bulk-delete` – delete many sent or failed events.
///
/// Same per-id semantics as bulk retry: each id is checked independently
/// and partial success is reported per id.
pub async fn bulk_delete(
    state: axum::extract::State<AppState>,
    Json(request): Json<BulkEventRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    let mut results = Vec::with_capacity(request.event_ids.len());

    for event_id in request.event_ids {
        match state.store.delete(event_id).await {
            Ok(()) => results.push(BulkItemOutcome {
                event_id,
                success: true,
                error: None,
            }),
            Err(e @ (StoreError::NotFound(_) | StoreError::IllegalState { .. })) => {
                results.push(BulkItemOutcome {
                    event_id,
                    success: false,
                    error: Some(e.to_string()),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    let failed = results.len() - succeeded;
    Ok(Json(BulkEventResponse {
        results,
        succeeded,
        failed,
    }))
}
