// Copyright 2025 Cowboy AI, LLC.

//! Event store port and related types
//!
//! The log is a single global, append-only sequence of domain events.
//! Optimistic concurrency is scoped by an event filter: an append can
//! declare "no event matching this filter has landed after the token I
//! read", and the store checks that atomically with the commit.

use crate::events::DomainEvent;
use crate::filter::EventFilter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when working with the event store
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A query matched no events
    #[error("No events found")]
    NoEventsFound,

    /// Optimistic concurrency check failed: events matching the filter
    /// were committed after the declared last known event
    #[error("New events found after the last known event")]
    NewEventsFound,

    /// Failed to read events from the backend
    #[error("Failed to get events: {0}")]
    FailedToGetEvents(String),

    /// Failed to commit an event to the backend
    #[error("Failed to commit event: {0}")]
    FailedToCommitEvent(String),
}

/// Position of a committed event in the log
///
/// Tokens are strictly increasing in commit order. They are opaque to
/// callers: the only supported uses are ordering comparisons and handing
/// them back in an [`AppendCondition`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct EventToken(u64);

impl EventToken {
    /// Create a token from a raw log position
    pub fn new(position: u64) -> Self {
        Self(position)
    }

    /// The raw log position
    pub fn position(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A domain event as committed to the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StoredEvent {
    /// Position in the log
    pub token: EventToken,

    /// The actual domain event
    pub event: DomainEvent,

    /// When the event was stored
    pub stored_at: DateTime<Utc>,
}

impl StoredEvent {
    /// The tag of the stored event
    pub fn event_type(&self) -> crate::events::EventType {
        self.event.event_type()
    }
}

/// Optimistic concurrency guard for [`EventStore::append`]
///
/// Declares that, within the scope of `filter`, the caller has seen
/// everything up to `last_known_event` (`None` meaning "nothing matched").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendCondition {
    /// The scope of the concurrency check
    pub filter: EventFilter,

    /// The last matching token the caller observed, if any
    pub last_known_event: Option<EventToken>,
}

impl AppendCondition {
    /// Condition from a filter and the token it was read at
    pub fn new(filter: EventFilter, last_known_event: Option<EventToken>) -> Self {
        Self {
            filter,
            last_known_event,
        }
    }
}

/// Non-empty result of [`EventStore::query`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueriedEvents {
    /// Matching events in token order
    pub events: Vec<StoredEvent>,

    /// Token of the last event in `events`
    pub last_known_event: EventToken,
}

impl QueriedEvents {
    /// Build from a non-empty, token-ordered vec
    pub(crate) fn from_events(events: Vec<StoredEvent>) -> Option<Self> {
        let last_known_event = events.last()?.token;
        Some(Self {
            events,
            last_known_event,
        })
    }
}

/// Event store port
///
/// Implementations must make the condition check in `append` atomic with
/// the commit, and must hand out strictly increasing tokens.
#[async_trait]
pub trait EventStore: Send + Sync + fmt::Debug {
    /// Append an event to the log
    ///
    /// With a condition: if any event matching `condition.filter` has a
    /// token greater than `condition.last_known_event` (or any match
    /// exists at all when it is `None`), nothing is committed and the
    /// call fails with [`EventStoreError::NewEventsFound`].
    async fn append(
        &self,
        event: DomainEvent,
        condition: Option<AppendCondition>,
    ) -> Result<EventToken, EventStoreError>;

    /// All events matching the filter, in token order
    ///
    /// Fails with [`EventStoreError::NoEventsFound`] when nothing matches.
    async fn query(&self, filter: &EventFilter) -> Result<QueriedEvents, EventStoreError>;

    /// The whole log in token order
    ///
    /// An empty log yields an empty vec. Used by projections needing a
    /// cold-start view.
    async fn all(&self) -> Result<Vec<StoredEvent>, EventStoreError>;
}
