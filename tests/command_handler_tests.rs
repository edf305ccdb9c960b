// Copyright 2025 Cowboy AI, LLC.

//! End-to-end command handling over the in-memory store
//!
//! Drives the real deciders through the `CommandRunner` and checks what
//! lands on the log: idempotent resends append nothing, aggregates
//! interleave on one global log, and a lost optimistic-concurrency race
//! surfaces as a wrapped conflict.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use preprint_review_domain::infrastructure::{
    AppendCondition, EventStore, EventStoreError, EventToken, InMemoryEventStore, QueriedEvents,
    StoredEvent,
};
use preprint_review_domain::{
    CommandRunner, Doi, DomainEvent, EventFilter, EventType, OrcidId, RequestId, ReviewCommand,
    ReviewCommandHandler, ReviewId, ReviewRequestCommand, ReviewRequestCommandHandler,
    ReviewRequestStarted,
};
use std::sync::Arc;

fn preprint() -> Doi {
    Doi::parse("10.1101/2024.01.01.573801").unwrap()
}

fn orcid() -> OrcidId {
    OrcidId::parse("0000-0002-1825-0097").unwrap()
}

/// The full request lifecycle, with the decision errors on the way
#[tokio::test]
async fn test_request_lifecycle() {
    let runner = CommandRunner::new(Arc::new(InMemoryEventStore::new()));
    let request_id = RequestId::new();

    let token = runner
        .run(
            &ReviewRequestCommandHandler,
            ReviewRequestCommand::Start {
                request_id,
                preprint: preprint(),
                requested_by: orcid(),
            },
        )
        .await
        .unwrap();
    assert!(token.is_some());

    // Resending the same start is a recognized no-op
    let token = runner
        .run(
            &ReviewRequestCommandHandler,
            ReviewRequestCommand::Start {
                request_id,
                preprint: preprint(),
                requested_by: orcid(),
            },
        )
        .await
        .unwrap();
    assert!(token.is_none());

    runner
        .run(
            &ReviewRequestCommandHandler,
            ReviewRequestCommand::Accept { request_id },
        )
        .await
        .unwrap();

    // Rejecting an accepted request is a domain error, not a store error
    let error = runner
        .run(
            &ReviewRequestCommandHandler,
            ReviewRequestCommand::Reject {
                request_id,
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert!(!error.is_conflict());
    assert_eq!(
        error.to_string(),
        "Invalid state transition from Accepted to Rejected"
    );

    let tags: Vec<EventType> = runner
        .store()
        .all()
        .await
        .unwrap()
        .iter()
        .map(StoredEvent::event_type)
        .collect();
    assert_eq!(
        tags,
        vec![
            EventType::ReviewRequestStarted,
            EventType::ReviewRequestAccepted
        ]
    );
}

/// Requests and reviews interleave on the one global log
#[tokio::test]
async fn test_aggregates_share_the_global_log() {
    let store = Arc::new(InMemoryEventStore::new());
    let runner = CommandRunner::new(Arc::clone(&store));

    let request_id = RequestId::new();
    let review_id = ReviewId::new();

    runner
        .run(
            &ReviewRequestCommandHandler,
            ReviewRequestCommand::Start {
                request_id,
                preprint: preprint(),
                requested_by: orcid(),
            },
        )
        .await
        .unwrap();
    runner
        .run(
            &ReviewCommandHandler,
            ReviewCommand::Start {
                review_id,
                preprint: preprint(),
                author: orcid(),
            },
        )
        .await
        .unwrap();
    runner
        .run(
            &ReviewRequestCommandHandler,
            ReviewRequestCommand::Accept { request_id },
        )
        .await
        .unwrap();
    runner
        .run(
            &ReviewCommandHandler,
            ReviewCommand::EnterText {
                review_id,
                text: "Methods are sound.".to_string(),
            },
        )
        .await
        .unwrap();

    let tags: Vec<EventType> = store
        .all()
        .await
        .unwrap()
        .iter()
        .map(StoredEvent::event_type)
        .collect();
    assert_eq!(
        tags,
        vec![
            EventType::ReviewRequestStarted,
            EventType::ReviewStarted,
            EventType::ReviewRequestAccepted,
            EventType::ReviewTextEntered,
        ]
    );
}

/// Store whose reads lag behind its writes. `query` pretends the scope is
/// empty, so every conditional append races against what is already there.
#[derive(Debug)]
struct StaleReadStore {
    inner: InMemoryEventStore,
}

#[async_trait]
impl EventStore for StaleReadStore {
    async fn append(
        &self,
        event: DomainEvent,
        condition: Option<AppendCondition>,
    ) -> Result<EventToken, EventStoreError> {
        self.inner.append(event, condition).await
    }

    async fn query(&self, _filter: &EventFilter) -> Result<QueriedEvents, EventStoreError> {
        Err(EventStoreError::NoEventsFound)
    }

    async fn all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.inner.all().await
    }
}

/// A lost race surfaces as a conflict wrapped in the command error
#[tokio::test]
async fn test_lost_race_surfaces_as_conflict() {
    let request_id = RequestId::new();

    let inner = InMemoryEventStore::new();
    inner
        .append(
            ReviewRequestStarted {
                request_id,
                preprint: preprint(),
                requested_by: orcid(),
            }
            .into(),
            None,
        )
        .await
        .unwrap();

    let runner = CommandRunner::new(Arc::new(StaleReadStore { inner }));

    // The stale read saw nothing, so the decider happily starts the
    // request again; the conditional append must catch the race.
    let error = runner
        .run(
            &ReviewRequestCommandHandler,
            ReviewRequestCommand::Start {
                request_id,
                preprint: preprint(),
                requested_by: orcid(),
            },
        )
        .await
        .unwrap_err();

    assert!(error.is_conflict());
    assert_eq!(runner.store().all().await.unwrap().len(), 1);
}
