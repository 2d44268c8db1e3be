pub mod outbox_events;

use outpost_sdk::objects::events::EventStatus as SdkEventStatus;

/// Event lifecycle status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `outpost_sdk::objects::events::EventStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "event_status")]
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

impl From<EventStatus> for SdkEventStatus {
    fn from(value: EventStatus) -> Self {
        match value {
            EventStatus::New => SdkEventStatus::New,
            EventStatus::Processing => SdkEventStatus::Processing,
            EventStatus::Sent => SdkEventStatus::Sent,
            EventStatus::Failed => SdkEventStatus::Failed,
        }
    }
}

impl From<SdkEventStatus> for EventStatus {
    fn from(value: SdkEventStatus) -> Self {
        match value {
            SdkEventStatus::New => EventStatus::New,
            SdkEventStatus::Processing => EventStatus::Processing,
            SdkEventStatus::Sent => EventStatus::Sent,
            SdkEventStatus::Failed => EventStatus::Failed,
        }
    }
}
