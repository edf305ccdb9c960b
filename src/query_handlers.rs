//! Query handlers
//!
//! Two engines serve reads. An on-demand query recomputes its answer from
//! the filtered log on every call, so it always reflects the latest commit
//! at the cost of a log read. A stateful query keeps a projection in memory,
//! fed by the dispatcher, and answers from it without touching the store.

use crate::command_handlers::CommandHandler;
use crate::domain::review_request::{request_events, ReviewRequestCommandHandler};
use crate::domain::ReviewRequestState;
use crate::filter::EventFilter;
use crate::identifiers::RequestId;
use crate::infrastructure::event_dispatcher::{EventDispatcher, EventSubscription};
use crate::infrastructure::event_store::{EventStore, EventStoreError, EventToken, StoredEvent};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors surfaced by the query engines
#[derive(Debug, Error)]
pub enum QueryError<E> {
    /// The store failed while reading history
    #[error("Unable to query: {0}")]
    UnableToQuery(#[source] EventStoreError),

    /// The query itself failed; passed through unwrapped
    #[error(transparent)]
    Query(E),
}

/// A read recomputed from the filtered log on every call
pub trait OnDemandQuery {
    /// The input selecting what to read
    type Input;
    /// The answer produced
    type Output;
    /// Domain failures the query can produce
    type Error;

    /// The slice of the log this query reads
    fn filter(&self, input: &Self::Input) -> EventFilter;

    /// Compute the answer from the matching events
    ///
    /// An empty slice means nothing matched; the query decides whether that
    /// is an answer or a failure.
    fn answer(
        &self,
        events: &[StoredEvent],
        input: &Self::Input,
    ) -> Result<Self::Output, Self::Error>;
}

/// Runs on-demand queries against an event store
#[derive(Debug)]
pub struct QueryRunner<S> {
    store: Arc<S>,
}

impl<S> Clone for QueryRunner<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: EventStore> QueryRunner<S> {
    /// Create a runner over the given store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Run one query against the latest committed state
    pub async fn run<Q>(
        &self,
        query: &Q,
        input: Q::Input,
    ) -> Result<Q::Output, QueryError<Q::Error>>
    where
        Q: OnDemandQuery,
    {
        let filter = query.filter(&input);
        let events = match self.store.query(&filter).await {
            Ok(queried) => queried.events,
            Err(EventStoreError::NoEventsFound) => Vec::new(),
            Err(e) => return Err(QueryError::UnableToQuery(e)),
        };
        query.answer(&events, &input).map_err(QueryError::Query)
    }
}

/// Failure of [`ReviewRequestLookup`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewRequestLookupError {
    /// No events exist for the request
    #[error("Review request not found")]
    NotFound,
}

/// Looks up the current state of one review request
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewRequestLookup;

impl OnDemandQuery for ReviewRequestLookup {
    type Input = RequestId;
    type Output = ReviewRequestState;
    type Error = ReviewRequestLookupError;

    fn filter(&self, input: &Self::Input) -> EventFilter {
        request_events(*input)
    }

    fn answer(
        &self,
        events: &[StoredEvent],
        _input: &Self::Input,
    ) -> Result<Self::Output, Self::Error> {
        let handler = ReviewRequestCommandHandler;
        let state = events.iter().fold(handler.initial_state(), |s, e| {
            handler.evolve(s, &e.event)
        });
        if state == ReviewRequestState::NotStarted {
            return Err(ReviewRequestLookupError::NotFound);
        }
        Ok(state)
    }
}

/// A projection maintained incrementally from dispatched events
pub trait StatefulQuery: Send + Sync + 'static {
    /// The projection the reducer maintains
    type State: Send + Sync + 'static;

    /// The projection before any event arrives
    fn initial_state(&self) -> Self::State;

    /// Fold one committed event into the projection
    ///
    /// The reducer sees every committed event and ignores what it does not
    /// care about. It cannot fail; data it cannot use is skipped.
    fn update(&self, state: &mut Self::State, event: &StoredEvent);
}

/// Handle to a running stateful query
///
/// The reducer task is the projection's only writer. Reads take a snapshot
/// under the read lock. Dropping the handle aborts the task.
pub struct StatefulQueryHandle<Q: StatefulQuery> {
    state: Arc<RwLock<Q::State>>,
    task: JoinHandle<()>,
}

impl<Q: StatefulQuery> fmt::Debug for StatefulQueryHandle<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulQueryHandle")
            .field("query", &std::any::type_name::<Q>())
            .finish()
    }
}

impl<Q: StatefulQuery> StatefulQueryHandle<Q> {
    /// Start the reducer, reflecting events from the subscription point on
    ///
    /// History committed before the call is not replayed; use
    /// [`StatefulQueryHandle::spawn_with_catch_up`] when the projection
    /// needs a view of the whole log.
    pub fn spawn(dispatcher: &EventDispatcher, query: Q) -> Self {
        let subscription = dispatcher.subscribe();
        let state = query.initial_state();
        Self::start(query, subscription, state, None)
    }

    /// Start the reducer from a fold of the full log, then follow live events
    ///
    /// The subscription is opened before the log is read, so an append
    /// racing the catch-up is seen twice: once in the fold and once live.
    /// The live copy is skipped by its token.
    pub async fn spawn_with_catch_up<S: EventStore>(
        store: &S,
        dispatcher: &EventDispatcher,
        query: Q,
    ) -> Result<Self, EventStoreError> {
        let subscription = dispatcher.subscribe();
        let history = store.all().await?;
        let caught_up_to = history.last().map(|e| e.token);

        let mut state = query.initial_state();
        for event in &history {
            query.update(&mut state, event);
        }

        Ok(Self::start(query, subscription, state, caught_up_to))
    }

    fn start(
        query: Q,
        mut subscription: EventSubscription,
        state: Q::State,
        caught_up_to: Option<EventToken>,
    ) -> Self {
        let state = Arc::new(RwLock::new(state));
        let reducer_state = Arc::clone(&state);

        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                // Already folded during catch-up
                if caught_up_to.is_some_and(|high_water| event.token <= high_water) {
                    continue;
                }
                let mut state = reducer_state.write().unwrap_or_else(PoisonError::into_inner);
                query.update(&mut state, &event);
            }
        });

        Self { state, task }
    }

    /// Read the current projection
    ///
    /// A reducer that panicked mid-update poisons the lock; reads recover
    /// the last written state rather than propagating the panic.
    pub fn read<R>(&self, f: impl FnOnce(&Q::State) -> R) -> R {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Whether the reducer task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl<Q: StatefulQuery> Drop for StatefulQueryHandle<Q> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
