// Copyright 2025 Cowboy AI, LLC.

//! In-memory event store
//!
//! The whole log lives in a `Vec` behind a write lock. Holding the lock
//! across condition check, token assignment, push, and dispatcher publish
//! makes the conditional append atomic and keeps dispatch order equal to
//! commit order.

use crate::events::DomainEvent;
use crate::filter::EventFilter;
use crate::infrastructure::event_dispatcher::EventDispatcher;
use crate::infrastructure::event_store::{
    AppendCondition, EventStore, EventStoreError, EventToken, QueriedEvents, StoredEvent,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

/// Event store backed by process memory
///
/// Suitable for tests and single-process deployments; nothing survives a
/// restart.
#[derive(Debug)]
pub struct InMemoryEventStore {
    log: RwLock<Vec<StoredEvent>>,
    dispatcher: EventDispatcher,
}

impl InMemoryEventStore {
    /// Create an empty store with its own dispatcher
    pub fn new() -> Self {
        Self::with_dispatcher(EventDispatcher::new())
    }

    /// Create an empty store publishing to the given dispatcher
    pub fn with_dispatcher(dispatcher: EventDispatcher) -> Self {
        Self {
            log: RwLock::new(Vec::new()),
            dispatcher,
        }
    }

    /// The dispatcher this store publishes committed events to
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    fn condition_violated(log: &[StoredEvent], condition: &AppendCondition) -> bool {
        let last_matching = log
            .iter()
            .rev()
            .find(|stored| condition.filter.matches(&stored.event))
            .map(|stored| stored.token);

        match (last_matching, condition.last_known_event) {
            (Some(found), Some(known)) => found > known,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        event: DomainEvent,
        condition: Option<AppendCondition>,
    ) -> Result<EventToken, EventStoreError> {
        let mut log = self.log.write().await;

        if let Some(condition) = &condition {
            if Self::condition_violated(&log, condition) {
                return Err(EventStoreError::NewEventsFound);
            }
        }

        let token = EventToken::new(log.len() as u64 + 1);
        let stored = StoredEvent {
            token,
            event,
            stored_at: Utc::now(),
        };
        log.push(stored.clone());

        // Publish before releasing the lock so dispatch order is commit order
        self.dispatcher.publish(&stored);

        debug!(token = %token, tag = %stored.event.event_type(), "Committed event");
        Ok(token)
    }

    async fn query(&self, filter: &EventFilter) -> Result<QueriedEvents, EventStoreError> {
        let log = self.log.read().await;
        let events: Vec<StoredEvent> = log
            .iter()
            .filter(|stored| filter.matches(&stored.event))
            .cloned()
            .collect();

        QueriedEvents::from_events(events).ok_or(EventStoreError::NoEventsFound)
    }

    async fn all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        Ok(self.log.read().await.clone())
    }
}
