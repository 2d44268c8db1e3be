use axum::{Json, extract::Query, response::IntoResponse};
use outpost_core::store::{EventFilter, EventStore};
use outpost_sdk::objects::events::{EventPage, ListEventsQuery, clamp_pagination};

use crate::state::AppState;

use super::{AdminApiError, event_to_admin_response};

/// `GET /events` – list events with pagination and optional filters.
///
/// Read-only; never changes event state.
pub async fn list_events(
    state: axum::extract::State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);

    let filter = EventFilter {
        status: query.status.map(Into::into),
        event_type: query.event_type,
        limit,
        offset,
    };

    let page = state.store.list(&filter).await?;

    let response = EventPage {
        events: page.events.iter().map(event_to_admin_response).collect(),
        total: page.total,
        limit,
        offset,
    };
    Ok(Json(response))
}
