use axum::{Json, response::IntoResponse};
use outpost_core::store::{EventStore, StoreError};
use outpost_sdk::objects::events::{BulkEventRequest, BulkEventResponse, BulkItemOutcome};

use crate::state::AppState;

use super::AdminApiError;

/// `POST /events/bulk-retry` – re-queue many failed events.
///
/// The single-event legality check applies independently per id; the
/// operation is not atomic across ids and partial success is expected.
/// Only store unavailability aborts the whole request.
pub async fn bulk_retry(
    state: axum::extract::State<AppState>,
    Json(request): Json<BulkEventRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    let mut results = Vec::with_capacity(request.event_ids.len());

    for event_id in request.event_ids {
        match state.store.requeue(event_id).await {
            Ok(_) => results.push(BulkItemOutcome {
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
