// Copyright 2025 Cowboy AI, LLC.

//! Command handling pipeline
//!
//! A command handler is three pure functions over one aggregate's slice of
//! the log: a filter selecting the slice, a fold rebuilding state, and a
//! decision producing at most one new event. The runner wires them to an
//! event store with optimistic concurrency: the token observed at query time
//! guards the append, so a concurrent writer inside the same slice forces a
//! conflict instead of a lost update.
//!
//! ```mermaid
//! sequenceDiagram
//!     participant C as Caller
//!     participant R as CommandRunner
//!     participant S as EventStore
//!     C->>R: run(handler, command)
//!     R->>S: query(filter(command))
//!     S-->>R: events + last token
//!     R->>R: fold + decide
//!     R->>S: append(event, {filter, last token})
//!     S-->>R: new token
//!     R-->>C: Ok(Some(token))
//! ```

use crate::errors::DomainError;
use crate::events::DomainEvent;
use crate::filter::EventFilter;
use crate::infrastructure::event_store::{
    AppendCondition, EventStore, EventStoreError, EventToken,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by the command pipeline
#[derive(Debug, Error)]
pub enum CommandError {
    /// The store failed while reading history or committing the decision,
    /// including an optimistic concurrency conflict
    #[error("Unable to handle command: {0}")]
    UnableToHandleCommand(#[source] EventStoreError),

    /// The command is invalid for the current aggregate state
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl CommandError {
    /// Whether this failure is a concurrency conflict the caller may retry
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CommandError::UnableToHandleCommand(EventStoreError::NewEventsFound)
        )
    }
}

/// A command handler as three pure functions over one aggregate's history
///
/// Implementors carry no mutable state. All context a decision needs must
/// be rebuilt by `evolve` from the events selected by `filter`.
pub trait CommandHandler {
    /// The command type this handler accepts
    type Command;
    /// The aggregate state rebuilt from the filtered history
    type State;

    /// The slice of the log this command decides against
    fn filter(&self, command: &Self::Command) -> EventFilter;

    /// The state before any matching event exists
    fn initial_state(&self) -> Self::State;

    /// Apply one event to the state
    fn evolve(&self, state: Self::State, event: &DomainEvent) -> Self::State;

    /// Decide what the command means in the current state
    ///
    /// `Ok(None)` is a successful no-op and leaves the log untouched.
    fn decide(
        &self,
        state: &Self::State,
        command: &Self::Command,
    ) -> Result<Option<DomainEvent>, DomainError>;
}

/// Runs command handlers against an event store
#[derive(Debug)]
pub struct CommandRunner<S> {
    store: Arc<S>,
}

impl<S> Clone for CommandRunner<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: EventStore> CommandRunner<S> {
    /// Create a runner over the given store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The store this runner commits to
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run one command through query, fold, decide and conditional append
    ///
    /// Returns the token of the committed event, or `None` when the decision
    /// was a no-op. A concurrent append inside the command's filter between
    /// the read and the commit fails with
    /// [`EventStoreError::NewEventsFound`] wrapped in
    /// [`CommandError::UnableToHandleCommand`]. The runner never retries;
    /// the caller owns that decision.
    pub async fn run<H>(
        &self,
        handler: &H,
        command: H::Command,
    ) -> Result<Option<EventToken>, CommandError>
    where
        H: CommandHandler,
    {
        let filter = handler.filter(&command);

        // An empty slice is the aggregate's initial state, not a failure
        let (events, last_known_event) = match self.store.query(&filter).await {
            Ok(queried) => (queried.events, Some(queried.last_known_event)),
            Err(EventStoreError::NoEventsFound) => (Vec::new(), None),
            Err(e) => return Err(CommandError::UnableToHandleCommand(e)),
        };

        let state = events.iter().fold(handler.initial_state(), |state, stored| {
            handler.evolve(state, &stored.event)
        });

        let Some(event) = handler.decide(&state, &command)? else {
            debug!("Command decided no event");
            return Ok(None);
        };

        let condition = AppendCondition::new(filter, last_known_event);
        let token = self
            .store
            .append(event, Some(condition))
            .await
            .map_err(CommandError::UnableToHandleCommand)?;

        debug!(token = %token, "Command committed event");
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventType, ReviewRequestStarted};
    use crate::filter::FilterClause;
    use crate::identifiers::{Doi, OrcidId, RequestId};
    use crate::infrastructure::in_memory_event_store::InMemoryEventStore;
    use crate::infrastructure::event_store::{QueriedEvents, StoredEvent};
    use async_trait::async_trait;
    use std::fmt;

    /// Records a start event once per request, then becomes a no-op
    struct RecordOnce;

    struct RecordOnceCommand {
        request_id: RequestId,
        poisoned: bool,
    }

    impl CommandHandler for RecordOnce {
        type Command = RecordOnceCommand;
        type State = bool;

        fn filter(&self, command: &Self::Command) -> EventFilter {
            FilterClause::of(EventType::ReviewRequestStarted)
                .with_predicate("request_id", command.request_id.to_string())
                .into()
        }

        fn initial_state(&self) -> Self::State {
            false
        }

        fn evolve(&self, state: Self::State, event: &DomainEvent) -> Self::State {
            state || matches!(event, DomainEvent::ReviewRequestStarted(_))
        }

        fn decide(
            &self,
            state: &Self::State,
            command: &Self::Command,
        ) -> Result<Option<DomainEvent>, DomainError> {
            if command.poisoned {
                return Err(DomainError::ValidationError("poisoned".to_string()));
            }
            if *state {
                return Ok(None);
            }
            Ok(Some(
                ReviewRequestStarted {
                    request_id: command.request_id,
                    preprint: Doi::parse("10.1101/2021.06.18.448882").unwrap(),
                    requested_by: OrcidId::parse("0000-0002-1825-0097").unwrap(),
                }
                .into(),
            ))
        }
    }

    fn command(request_id: RequestId) -> RecordOnceCommand {
        RecordOnceCommand {
            request_id,
            poisoned: false,
        }
    }

    /// Test the first run commits and the second is a no-op
    #[tokio::test]
    async fn test_idempotent_command() {
        let runner = CommandRunner::new(Arc::new(InMemoryEventStore::new()));
        let request_id = RequestId::new();

        let first = runner.run(&RecordOnce, command(request_id)).await.unwrap();
        assert!(first.is_some());

        let second = runner.run(&RecordOnce, command(request_id)).await.unwrap();
        assert!(second.is_none());

        let log = runner.store().all().await.unwrap();
        assert_eq!(log.len(), 1);
    }

    /// Test separate aggregates do not see each other's history
    #[tokio::test]
    async fn test_commands_are_scoped_by_filter() {
        let runner = CommandRunner::new(Arc::new(InMemoryEventStore::new()));

        let first = runner
            .run(&RecordOnce, command(RequestId::new()))
            .await
            .unwrap();
        let second = runner
            .run(&RecordOnce, command(RequestId::new()))
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_some());
        assert!(first.unwrap() < second.unwrap());
    }

    /// Test domain errors pass through unwrapped
    #[tokio::test]
    async fn test_domain_error_passthrough() {
        let runner = CommandRunner::new(Arc::new(InMemoryEventStore::new()));
        let mut cmd = command(RequestId::new());
        cmd.poisoned = true;

        let err = runner.run(&RecordOnce, cmd).await.unwrap_err();
        match err {
            CommandError::Domain(DomainError::ValidationError(reason)) => {
                assert_eq!(reason, "poisoned");
            }
            other => panic!("expected a domain error, got {other:?}"),
        }
    }

    /// Store double whose reads always fail
    struct BrokenStore;

    impl fmt::Debug for BrokenStore {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("BrokenStore")
        }
    }

    #[async_trait]
    impl EventStore for BrokenStore {
        async fn append(
            &self,
            _event: DomainEvent,
            _condition: Option<AppendCondition>,
        ) -> Result<EventToken, EventStoreError> {
            Err(EventStoreError::FailedToCommitEvent("down".to_string()))
        }

        async fn query(&self, _filter: &EventFilter) -> Result<QueriedEvents, EventStoreError> {
            Err(EventStoreError::FailedToGetEvents("down".to_string()))
        }

        async fn all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
            Err(EventStoreError::FailedToGetEvents("down".to_string()))
        }
    }

    /// Test store failures are wrapped for the caller
    #[tokio::test]
    async fn test_store_failure_is_wrapped() {
        let runner = CommandRunner::new(Arc::new(BrokenStore));

        let err = runner
            .run(&RecordOnce, command(RequestId::new()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CommandError::UnableToHandleCommand(EventStoreError::FailedToGetEvents(_))
        ));
        assert!(!err.is_conflict());
    }
}
