//! Request and response objects for the Outpost APIs.

pub mod events;

pub use events::{
    AdminEventResponse, BulkEventRequest, BulkEventResponse, BulkItemOutcome,
    EnqueueEventRequest, EnqueueEventResponse, EventPage, EventStatus, ListEventsQuery,
    clamp_pagination,
};
