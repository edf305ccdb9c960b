// Copyright (c) 2025 - Cowboy AI, LLC.

//! Review request aggregate
//!
//! A request asks the community to review a preprint. It is started by a
//! researcher and then either accepted or rejected. State is a pure fold
//! over the request's events; decisions are a table over (state, command).

use crate::command_handlers::CommandHandler;
use crate::commands::ReviewRequestCommand;
use crate::errors::DomainError;
use crate::events::{
    DomainEvent, EventType, ReviewRequestAccepted, ReviewRequestRejected, ReviewRequestStarted,
};
use crate::filter::{EventFilter, FilterClause};
use crate::identifiers::{Doi, RequestId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle state for a review request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ReviewRequestState {
    /// No events recorded for this request yet
    NotStarted,
    /// The request is open and waiting for a decision
    Started {
        /// The preprint the request is about
        preprint: Doi,
    },
    /// The request was accepted
    Accepted {
        /// The preprint the request is about
        preprint: Doi,
    },
    /// The request was rejected
    Rejected {
        /// The preprint the request is about
        preprint: Doi,
    },
}

impl ReviewRequestState {
    /// The display name of this state
    pub fn name(&self) -> &'static str {
        match self {
            ReviewRequestState::NotStarted => "NotStarted",
            ReviewRequestState::Started { .. } => "Started",
            ReviewRequestState::Accepted { .. } => "Accepted",
            ReviewRequestState::Rejected { .. } => "Rejected",
        }
    }

    /// Whether the request is open and waiting for a decision
    pub fn is_open(&self) -> bool {
        matches!(self, ReviewRequestState::Started { .. })
    }
}

/// Filter selecting every event of one request
pub fn request_events(request_id: RequestId) -> EventFilter {
    FilterClause::of(EventType::ReviewRequestStarted)
        .or_type(EventType::ReviewRequestAccepted)
        .or_type(EventType::ReviewRequestRejected)
        .with_predicate("request_id", request_id.to_string())
        .into()
}

/// Command handler for the review request aggregate
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewRequestCommandHandler;

impl CommandHandler for ReviewRequestCommandHandler {
    type Command = ReviewRequestCommand;
    type State = ReviewRequestState;

    fn filter(&self, command: &Self::Command) -> EventFilter {
        request_events(command.request_id())
    }

    fn initial_state(&self) -> Self::State {
        ReviewRequestState::NotStarted
    }

    fn evolve(&self, state: Self::State, event: &DomainEvent) -> Self::State {
        match event {
            DomainEvent::ReviewRequestStarted(e) => match state {
                ReviewRequestState::NotStarted => ReviewRequestState::Started {
                    preprint: e.preprint.clone(),
                },
                other => other,
            },
            DomainEvent::ReviewRequestAccepted(_) => match state {
                ReviewRequestState::Started { preprint } => {
                    ReviewRequestState::Accepted { preprint }
                }
                other => other,
            },
            DomainEvent::ReviewRequestRejected(_) => match state {
                ReviewRequestState::Started { preprint } => {
                    ReviewRequestState::Rejected { preprint }
                }
                other => other,
            },
            // Review events never match the request filter
            DomainEvent::ReviewStarted(_)
            | DomainEvent::ReviewTextEntered(_)
            | DomainEvent::CodeOfConductAgreed(_)
            | DomainEvent::CompetingInterestsDeclared(_)
            | DomainEvent::ReviewPublicationRequested(_)
            | DomainEvent::ReviewPublished(_) => state,
        }
    }

    fn decide(
        &self,
        state: &Self::State,
        command: &Self::Command,
    ) -> Result<Option<DomainEvent>, DomainError> {
        match (state, command) {
            (
                ReviewRequestState::NotStarted,
                ReviewRequestCommand::Start {
                    request_id,
                    preprint,
                    requested_by,
                },
            ) => Ok(Some(
                ReviewRequestStarted {
                    request_id: *request_id,
                    preprint: preprint.clone(),
                    requested_by: requested_by.clone(),
                }
                .into(),
            )),
            // Starting twice is a no-op, whatever became of the request
            (_, ReviewRequestCommand::Start { .. }) => Ok(None),

            (
                ReviewRequestState::Started { .. },
                ReviewRequestCommand::Accept { request_id },
            ) => Ok(Some(
                ReviewRequestAccepted {
                    request_id: *request_id,
                }
                .into(),
            )),
            (ReviewRequestState::Accepted { .. }, ReviewRequestCommand::Accept { .. }) => Ok(None),
            (state, ReviewRequestCommand::Accept { .. }) => {
                Err(DomainError::invalid_transition(state.name(), "Accepted"))
            }

            (
                ReviewRequestState::Started { .. },
                ReviewRequestCommand::Reject { request_id, reason },
            ) => Ok(Some(
                ReviewRequestRejected {
                    request_id: *request_id,
                    reason: reason.clone(),
                }
                .into(),
            )),
            (ReviewRequestState::Rejected { .. }, ReviewRequestCommand::Reject { .. }) => Ok(None),
            (state, ReviewRequestCommand::Reject { .. }) => {
                Err(DomainError::invalid_transition(state.name(), "Rejected"))
            }
        }
    }
}
