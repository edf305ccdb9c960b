//! # Preprint Review Domain
//!
//! Event-sourced core for a community preprint review platform.
//!
//! Everything that happens (a review request starting, a reviewer
//! agreeing to the code of conduct, a review being published) is a
//! [`DomainEvent`] on one global append-only log. State is never stored;
//! it is folded from events on demand:
//! - **Events**: the facts, serialized with a stable `tag` discriminator
//! - **Event store**: append with filter-scoped optimistic concurrency
//!   ([`infrastructure::EventStore`]), in-memory and NATS JetStream backed
//! - **Commands**: decisions over folded state ([`CommandRunner`] with
//!   per-aggregate [`CommandHandler`] decision tables)
//! - **Queries**: ad-hoc folds ([`QueryRunner`]) and live read models
//!   ([`StatefulQueryHandle`]) fed by the [`EventDispatcher`]
//! - **Reactions**: committed events triggering idempotent [`workflows`]
//!   whose side effects live behind [`workflows::activities`] ports
//!
//! ## Architecture
//!
//! ```mermaid
//! flowchart LR
//!     C[Command] --> R[CommandRunner]
//!     R -->|query + fold| S[(Event log)]
//!     R -->|conditional append| S
//!     S --> D[EventDispatcher]
//!     D --> P[Stateful queries]
//!     D --> X[ReactionEngine] --> W[Workflows] --> A[Activity ports]
//! ```
//!
//! ## Design Principles
//!
//! 1. **One log**: a single global event sequence; aggregates are filter
//!    scopes over it, not separate streams
//! 2. **Filter-scoped concurrency**: an append only conflicts with other
//!    events its own filter matches
//! 3. **Exhaustive decisions**: command and fold logic matches every
//!    state/event pair, so a new event variant fails compilation until
//!    every decision table handles it
//! 4. **Pure domain**: deciders and reaction rules are pure functions;
//!    all effects go through narrow async ports
//! 5. **Commit order is dispatch order**: subscribers and reactions see
//!    events in exactly the order the log accepted them

#![warn(missing_docs)]

mod commands;
mod command_handlers;
mod errors;
mod events;
mod filter;
mod identifiers;
mod query_handlers;

pub mod domain;
pub mod infrastructure;
pub mod projections;
pub mod reactions;
pub mod workflows;

// Re-export core types
pub use commands::{ReviewCommand, ReviewRequestCommand};
pub use command_handlers::{CommandError, CommandHandler, CommandRunner};
pub use errors::{DomainError, DomainResult};
pub use events::{
    CodeOfConductAgreed, CompetingInterestsDeclared, DomainEvent, EventType,
    ReviewPublicationRequested, ReviewPublished, ReviewRequestAccepted, ReviewRequestRejected,
    ReviewRequestStarted, ReviewStarted, ReviewTextEntered,
};
pub use filter::{EventFilter, FilterClause};
pub use identifiers::{Doi, OrcidId, RequestId, ReviewId};
pub use query_handlers::{
    OnDemandQuery, QueryError, QueryRunner, ReviewRequestLookup, ReviewRequestLookupError,
    StatefulQuery, StatefulQueryHandle,
};

// Re-export the infrastructure surface
pub use infrastructure::{
    AppendCondition, EventDispatcher, EventStore, EventStoreError, EventSubscription, EventToken,
    InMemoryEventStore, JetStreamConfig, JetStreamEventStore, NatsAuth, NatsClient, NatsConfig,
    NatsError,
    QueriedEvents, StoredEvent,
};

// Re-export the domain deciders and their states
pub use domain::{
    request_events, review_events, CompetingInterests, ReviewCommandHandler, ReviewDraft,
    ReviewRequestCommandHandler, ReviewRequestState, ReviewState,
};

// Re-export read models, reactions and workflows
pub use projections::{OpenRequest, OpenRequests, OpenRequestsProjection};
pub use reactions::{
    reactions_for, ReactionEngine, ReactionEngineHandle, ReactionError, WorkflowTrigger,
};
pub use workflows::{
    ClassifyPreprintWorkflow, InProcessWorkflowEngine, NotifyCommunityWorkflow,
    PublishReviewWorkflow, Workflow, WorkflowEngine, WorkflowEngineError, WorkflowName,
};
