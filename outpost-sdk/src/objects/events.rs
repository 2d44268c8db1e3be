//! Event types for the Admin and Service APIs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event lifecycle status for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `outpost-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    New,
    Processing,
    Sent,
    Failed,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::New => write!(f, "new"),
            EventStatus::Processing => write!(f, "processing"),
            EventStatus::Sent => write!(f, "sent"),
            EventStatus::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Full event detail for the admin API.
///
/// Carries everything an operator needs to decide the next action
/// (retry or delete) without consulting storage directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminEventResponse {
    pub event_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: EventStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub sent_at: Option<i64>,
}

/// One page of events plus pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<AdminEventResponse>,
    /// Total number of events matching the filter, across all pages.
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Per-id outcome of a bulk retry/delete operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemOutcome {
    pub event_id: Uuid,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for bulk retry/delete: partial success is expected and
/// reported per id, never as a single pass/fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkEventResponse {
    pub results: Vec<BulkItemOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Response for the service enqueue endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueEventResponse {
    pub event_id: Uuid,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body for the service enqueue endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueEventRequest {
    pub event_type: String,
    pub payload: serde_json::Value,
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
}

fn default_max_retries() -> i32 {
    3
}

/// Body for bulk retry/delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkEventRequest {
    pub event_ids: Vec<Uuid>,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 200;
const MAX_OFFSET: i64 = 100_000;

/// Query parameters for listing events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEventsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub status: Option<EventStatus>,
    pub event_type: Option<String>,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for ListEventsQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            status: None,
            event_type: None,
        }
    }
}

/// Clamp limit and offset to safe maximums.
pub fn clamp_pagination(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_LIMIT), offset.clamp(0, MAX_OFFSET))
}
