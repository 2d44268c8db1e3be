//! Application state shared across all request handlers.

use outpost_core::store::PgEventStore;
use sqlx::PgPool;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around. Dispatcher workers do not
/// hold it; they coordinate with the API purely through the event store.
#[derive(Clone)]
pub struct AppState {
    /// Postgres-backed event store behind all API operations.
    pub store: PgEventStore,
}

impl AppState {
    /// Create a new AppState over the given database pool.
    pub fn new(db: PgPool) -> Self {
        Self {
            store: PgEventStore::new(db),
        }
    }
}
