//! In-memory event store.
//!
//! Backed by a `BTreeMap` keyed by UUIDv7 event id: v7 ids are time-ordered,
//! so plain iteration visits events oldest first. Claiming holds the map
//! lock for the whole batch, which makes the select-and-transition atomic
//! with respect to concurrent claimers.
//!
//! Used by the test suite; also usable as an embedded store when durability
//! is provided elsewhere.

use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::EventStatus;
use crate::entities::outbox_events::{NewOutboxEvent, OutboxEvent};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::store::{EventFilter, EventPage, EventStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: Mutex<BTreeMap<Uuid, OutboxEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, new: NewOutboxEvent) -> Result<OutboxEvent, StoreError> {
        let now = OffsetDateTime::now_utc();
        let event = OutboxEvent {
            event_id: Uuid::now_v7(),
            event_type: new.event_type,
            payload: new.payload,
            status: EventStatus::New,
            retry_count: 0,
            max_retries: new.max_retries.max(0),
            last_error: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
        };
        self.events
            .lock()
            .await
            .insert(event.event_id, event.clone());
        Ok(event)
    }

    async fn claim_batch(
        &self,
        limit: i64,
        now: OffsetDateTime,
        policy: &RetryPolicy,
    ) -> Result<Vec<OutboxEvent>, StoreError> {
        let mut events = self.events.lock().await;
        let mut claimed = Vec::new();

        for event in events.values_mut() {
            if claimed.len() as i64 >= limit {
                break;
            }
            let eligible = match event.status {
                EventStatus::New => true,
                EventStatus::Failed => matches!(
                    policy.assess(
                        event.retry_count,
                        event.max_retries,
                        Some(event.updated_at),
                        now,
                    ),
                    RetryDecision::Eligible
                ),
                EventStatus::Processing | EventStatus::Sent => false,
            };
            if !eligible {
                continue;
            }
            event.status = EventStatus::Processing;
            event.updated_at = now;
            claimed.push(event.clone());
        }
        Ok(claimed)
    }

    async fn mark_sent(&self, event_id: Uuid) -> Result<(), StoreError> {
        let mut events = self.events.lock().await;
        let event = events
            .get_mut(&event_id)
            .ok_or(StoreError::NotFound(event_id))?;
        if event.status != EventStatus::Processing {
            return Err(StoreError::IllegalState {
                id: event_id,
                status: event.status,
                operation: "mark sent",
            });
        }
        let now = OffsetDateTime::now_utc();
        event.status = EventStatus::Sent;
        event.sent_at = Some(now);
        event.updated_at = now;
        Ok(())
    }

    async fn mark_failed(&self, event_id: Uuid, error: &str) -> Result<(), StoreError> {
        let mut events = self.events.lock().await;
        let event = events
            .get_mut(&event_id)
            .ok_or(StoreError::NotFound(event_id))?;
        if event.status != EventStatus::Processing {
            return Err(StoreError::IllegalState {
                id: event_id,
                status: event.status,
                operation: "mark failed",
            });
        }
        event.status = EventStatus::Failed;
        // Saturating: a manually forced attempt past the cap keeps
        // retry_count <= max_retries.
        event.retry_count = (event.retry_count + 1).min(event.max_retries);
        event.last_error = Some(error.to_string());
        event.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<OutboxEvent>, StoreError> {
        Ok(self.events.lock().await.get(&event_id).cloned())
    }

    async fn list(&self, filter: &EventFilter) -> Result<EventPage, StoreError> {
        let events = self.events.lock().await;
        let matching: Vec<&OutboxEvent> = events
            .values()
            .filter(|e| filter.status.is_none_or(|s| e.status == s))
            .filter(|e| {
                filter
                    .event_type
                    .as_deref()
                    .is_none_or(|t| e.event_type == t)
            })
            .collect();
        let total = matching.len() as i64;

        // Newest first, matching the Postgres store's list order.
        let page = matching
            .into_iter()
            .rev()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok(EventPage {
            events: page,
            total,
        })
    }

    async fn requeue(&self, event_id: Uuid) -> Result<OutboxEvent, StoreError> {
        let mut events = self.events.lock().await;
        let event = events
            .get_mut(&event_id)
            .ok_or(StoreError::NotFound(event_id))?;
        if event.status != EventStatus::Failed {
            return Err(StoreError::IllegalState {
                id: event_id,
                status: event.status,
                operation: "retry",
            });
        }
        event.status = EventStatus::New;
        event.updated_at = OffsetDateTime::now_utc();
        Ok(event.clone())
    }

    async fn delete(&self, event_id: Uuid) -> Result<(), StoreError> {
        let mut events = self.events.lock().await;
        let Some(event) = events.get(&event_id) else {
            return Err(StoreError::NotFound(event_id));
        };
        match event.status {
            EventStatus::Sent | EventStatus::Failed => {
                events.remove(&event_id);
                Ok(())
            }
            status @ (EventStatus::New | EventStatus::Processing) => {
                Err(StoreError::IllegalState {
                    id: event_id,
                    status,
                    operation: "delete",
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(max_retries: i32) -> NewOutboxEvent {
        NewOutboxEvent {
            event_type: "ORDER_CREATED".to_string(),
            payload: json!({"order_id": 42}),
            max_retries,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            base: time::Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    /// Claim with a fresh `now`, so zero-base backoff windows are always
    /// elapsed.
    async fn claim(store: &MemoryEventStore, limit: i64) -> Vec<OutboxEvent> {
        store
            .claim_batch(limit, OffsetDateTime::now_utc(), &policy())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_id_and_new_status() {
        let store = MemoryEventStore::new();
        let event = store.insert(sample(3)).await.unwrap();
        assert_eq!(event.status, EventStatus::New);
        assert_eq!(event.retry_count, 0);
        assert_eq!(event.sent_at, None);

        let fetched = store.get(event.event_id).await.unwrap().unwrap();
        assert_eq!(fetched, event);
    }

    #[tokio::test]
    async fn claim_moves_new_to_processing_oldest_first() {
        let store = MemoryEventStore::new();
        let first = store.insert(sample(3)).await.unwrap();
        let second = store.insert(sample(3)).await.unwrap();

        let claimed = claim(&store, 1).await;
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].event_id, first.event_id);
        assert_eq!(claimed[0].status, EventStatus::Processing);

        // The second event is still unclaimed; the first is not reclaimable.
        let claimed = claim(&store, 10).await;
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].event_id, second.event_id);

        assert!(claim(&store, 10).await.is_empty());
    }

    #[tokio::test]
    async fn failed_events_under_cap_are_reclaimed() {
        let store = MemoryEventStore::new();
        let event = store.insert(sample(2)).await.unwrap();

        claim(&store, 1).await;
        store.mark_failed(event.event_id, "boom").await.unwrap();

        let claimed = claim(&store, 1).await;
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].retry_count, 1);
        assert_eq!(claimed[0].last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn exhausted_events_are_not_reclaimed() {
        let store = MemoryEventStore::new();
        let event = store.insert(sample(1)).await.unwrap();

        claim(&store, 1).await;
        store.mark_failed(event.event_id, "boom").await.unwrap();

        let row = store.get(event.event_id).await.unwrap().unwrap();
        assert_eq!(row.status, EventStatus::Failed);
        assert_eq!(row.retry_count, 1);
        assert!(claim(&store, 10).await.is_empty());
    }

    #[tokio::test]
    async fn mark_sent_requires_processing() {
        let store = MemoryEventStore::new();
        let event = store.insert(sample(3)).await.unwrap();

        let err = store.mark_sent(event.event_id).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::IllegalState {
                status: EventStatus::New,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn retry_count_saturates_at_the_cap() {
        let store = MemoryEventStore::new();
        let event = store.insert(sample(1)).await.unwrap();

        claim(&store, 1).await;
        store.mark_failed(event.event_id, "first").await.unwrap();

        // Operator forces a retry past the cap; another failure must not
        // push retry_count beyond max_retries.
        store.requeue(event.event_id).await.unwrap();
        claim(&store, 1).await;
        store.mark_failed(event.event_id, "second").await.unwrap();

        let row = store.get(event.event_id).await.unwrap().unwrap();
        assert_eq!(row.retry_count, 1);
        assert_eq!(row.max_retries, 1);
        assert_eq!(row.last_error.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn requeue_rejects_non_failed_events() {
        let store = MemoryEventStore::new();
        let event = store.insert(sample(3)).await.unwrap();

        let err = store.requeue(event.event_id).await.unwrap_err();
        assert!(matches!(err, StoreError::IllegalState { .. }));

        let missing = Uuid::now_v7();
        let err = store.requeue(missing).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn delete_rejects_new_and_processing() {
        let store = MemoryEventStore::new();
        let event = store.insert(sample(3)).await.unwrap();

        let err = store.delete(event.event_id).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::IllegalState {
                status: EventStatus::New,
                ..
            }
        ));

        claim(&store, 1).await;
        let err = store.delete(event.event_id).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::IllegalState {
                status: EventStatus::Processing,
                ..
            }
        ));

        // Row is unchanged after the rejected deletes.
        let row = store.get(event.event_id).await.unwrap().unwrap();
        assert_eq!(row.status, EventStatus::Processing);

        store.mark_sent(event.event_id).await.unwrap();
        store.delete(event.event_id).await.unwrap();
        assert!(store.get(event.event_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let store = MemoryEventStore::new();
        for _ in 0..3 {
            store.insert(sample(3)).await.unwrap();
        }
        store
            .insert(NewOutboxEvent {
                event_type: "QUOTE_EXPIRED".to_string(),
                payload: json!({}),
                max_retries: 3,
            })
            .await
            .unwrap();

        let page = store
            .list(&EventFilter {
                status: Some(EventStatus::New),
                event_type: Some("ORDER_CREATED".to_string()),
                limit: 2,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.events.len(), 2);

        let page = store
            .list(&EventFilter {
                status: None,
                event_type: None,
                limit: 10,
                offset: 2,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.events.len(), 2);
    }
}
