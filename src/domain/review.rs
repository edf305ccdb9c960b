// Copyright (c) 2025 - Cowboy AI, LLC.

//! Review aggregate
//!
//! A review is drafted by one author against one preprint. The draft can be
//! edited until publication is requested; publication requires entered text
//! and an agreed code of conduct. Once published the review is immutable.
//!
//! ```mermaid
//! stateDiagram-v2
//!     [*] --> InProgress: Start
//!     InProgress --> InProgress: EnterText / AgreeToCodeOfConduct / DeclareCompetingInterests
//!     InProgress --> PublicationRequested: RequestPublication
//!     PublicationRequested --> Published: MarkAsPublished
//! ```

use crate::command_handlers::CommandHandler;
use crate::commands::ReviewCommand;
use crate::errors::DomainError;
use crate::events::{
    CodeOfConductAgreed, CompetingInterestsDeclared, DomainEvent, EventType,
    ReviewPublicationRequested, ReviewPublished, ReviewStarted, ReviewTextEntered,
};
use crate::filter::{EventFilter, FilterClause};
use crate::identifiers::{Doi, OrcidId, ReviewId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A recorded competing interests declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompetingInterests {
    /// The declaration text; `None` means none to declare
    pub statement: Option<String>,
}

/// The mutable content of an unpublished review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewDraft {
    /// The preprint under review
    pub preprint: Doi,
    /// The researcher writing the review
    pub author: OrcidId,
    /// The review text, once entered
    pub text: Option<String>,
    /// Whether the author agreed to the code of conduct
    pub code_of_conduct_agreed: bool,
    /// The competing interests declaration, once made
    pub competing_interests: Option<CompetingInterests>,
}

impl ReviewDraft {
    fn new(preprint: Doi, author: OrcidId) -> Self {
        Self {
            preprint,
            author,
            text: None,
            code_of_conduct_agreed: false,
            competing_interests: None,
        }
    }

    /// What publication still needs, `None` when the draft is complete
    pub fn missing_for_publication(&self) -> Option<String> {
        let mut missing = Vec::new();
        if self.text.is_none() {
            missing.push("review text");
        }
        if !self.code_of_conduct_agreed {
            missing.push("code of conduct agreement");
        }
        if missing.is_empty() {
            None
        } else {
            Some(missing.join(" and "))
        }
    }
}

/// Lifecycle state for a review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ReviewState {
    /// No events recorded for this review yet
    NotStarted,
    /// The review is being drafted
    InProgress(ReviewDraft),
    /// The author asked for publication; the draft is frozen
    PublicationRequested(ReviewDraft),
    /// The review is published
    Published {
        /// The DOI the published review received
        doi: Doi,
    },
}

impl ReviewState {
    /// The display name of this state
    pub fn name(&self) -> &'static str {
        match self {
            ReviewState::NotStarted => "NotStarted",
            ReviewState::InProgress(_) => "InProgress",
            ReviewState::PublicationRequested(_) => "PublicationRequested",
            ReviewState::Published { .. } => "Published",
        }
    }

    /// Whether the review reached publication
    pub fn is_published(&self) -> bool {
        matches!(self, ReviewState::Published { .. })
    }
}

/// Filter selecting every event of one review
pub fn review_events(review_id: ReviewId) -> EventFilter {
    FilterClause::of(EventType::ReviewStarted)
        .or_type(EventType::ReviewTextEntered)
        .or_type(EventType::CodeOfConductAgreed)
        .or_type(EventType::CompetingInterestsDeclared)
        .or_type(EventType::ReviewPublicationRequested)
        .or_type(EventType::ReviewPublished)
        .with_predicate("review_id", review_id.to_string())
        .into()
}

/// Command handler for the review aggregate
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewCommandHandler;

impl CommandHandler for ReviewCommandHandler {
    type Command = ReviewCommand;
    type State = ReviewState;

    fn filter(&self, command: &Self::Command) -> EventFilter {
        review_events(command.review_id())
    }

    fn initial_state(&self) -> Self::State {
        ReviewState::NotStarted
    }

    fn evolve(&self, state: Self::State, event: &DomainEvent) -> Self::State {
        match event {
            DomainEvent::ReviewStarted(e) => match state {
                ReviewState::NotStarted => {
                    ReviewState::InProgress(ReviewDraft::new(e.preprint.clone(), e.author.clone()))
                }
                other => other,
            },
            DomainEvent::ReviewTextEntered(e) => match state {
                ReviewState::InProgress(mut draft) => {
                    draft.text = Some(e.text.clone());
                    ReviewState::InProgress(draft)
                }
                other => other,
            },
            DomainEvent::CodeOfConductAgreed(_) => match state {
                ReviewState::InProgress(mut draft) => {
                    draft.code_of_conduct_agreed = true;
                    ReviewState::InProgress(draft)
                }
                other => other,
            },
            DomainEvent::CompetingInterestsDeclared(e) => match state {
                ReviewState::InProgress(mut draft) => {
                    draft.competing_interests = Some(CompetingInterests {
                        statement: e.statement.clone(),
                    });
                    ReviewState::InProgress(draft)
                }
                other => other,
            },
            DomainEvent::ReviewPublicationRequested(_) => match state {
                ReviewState::InProgress(draft) => ReviewState::PublicationRequested(draft),
                other => other,
            },
            DomainEvent::ReviewPublished(e) => match state {
                ReviewState::PublicationRequested(_) => ReviewState::Published {
                    doi: e.doi.clone(),
                },
                other => other,
            },
            // Request events never match the review filter
            DomainEvent::ReviewRequestStarted(_)
            | DomainEvent::ReviewRequestAccepted(_)
            | DomainEvent::ReviewRequestRejected(_) => state,
        }
    }

    fn decide(
        &self,
        state: &Self::State,
        command: &Self::Command,
    ) -> Result<Option<DomainEvent>, DomainError> {
        match (state, command) {
            (
                ReviewState::NotStarted,
                ReviewCommand::Start {
                    review_id,
                    preprint,
                    author,
                },
            ) => Ok(Some(
                ReviewStarted {
                    review_id: *review_id,
                    preprint: preprint.clone(),
                    author: author.clone(),
                }
                .into(),
            )),
            // Starting twice is a no-op, whatever became of the review
            (_, ReviewCommand::Start { .. }) => Ok(None),

            (ReviewState::InProgress(draft), ReviewCommand::EnterText { review_id, text }) => {
                if draft.text.as_deref() == Some(text) {
                    return Ok(None);
                }
                Ok(Some(
                    ReviewTextEntered {
                        review_id: *review_id,
                        text: text.clone(),
                    }
                    .into(),
                ))
            }
            (state, ReviewCommand::EnterText { .. }) => {
                Err(DomainError::invalid_transition(state.name(), "InProgress"))
            }

            (
                ReviewState::InProgress(draft),
                ReviewCommand::AgreeToCodeOfConduct { review_id },
            ) => {
                if draft.code_of_conduct_agreed {
                    return Ok(None);
                }
                Ok(Some(
                    CodeOfConductAgreed {
                        review_id: *review_id,
                    }
                    .into(),
                ))
            }
            (state, ReviewCommand::AgreeToCodeOfConduct { .. }) => {
                Err(DomainError::invalid_transition(state.name(), "InProgress"))
            }

            (
                ReviewState::InProgress(draft),
                ReviewCommand::DeclareCompetingInterests {
                    review_id,
                    statement,
                },
            ) => {
                let declared = CompetingInterests {
                    statement: statement.clone(),
                };
                if draft.competing_interests.as_ref() == Some(&declared) {
                    return Ok(None);
                }
                Ok(Some(
                    CompetingInterestsDeclared {
                        review_id: *review_id,
                        statement: statement.clone(),
                    }
                    .into(),
                ))
            }
            (state, ReviewCommand::DeclareCompetingInterests { .. }) => {
                Err(DomainError::invalid_transition(state.name(), "InProgress"))
            }

            (ReviewState::InProgress(draft), ReviewCommand::RequestPublication { review_id }) => {
                if let Some(missing) = draft.missing_for_publication() {
                    return Err(DomainError::IncompleteReview { missing });
                }
                Ok(Some(
                    ReviewPublicationRequested {
                        review_id: *review_id,
                    }
                    .into(),
                ))
            }
            // Publication already requested or done
            (
                ReviewState::PublicationRequested(_) | ReviewState::Published { .. },
                ReviewCommand::RequestPublication { .. },
            ) => Ok(None),
            (state, ReviewCommand::RequestPublication { .. }) => Err(
                DomainError::invalid_transition(state.name(), "PublicationRequested"),
            ),

            (
                ReviewState::PublicationRequested(_),
                ReviewCommand::MarkAsPublished { review_id, doi },
            ) => Ok(Some(
                ReviewPublished {
                    review_id: *review_id,
                    doi: doi.clone(),
                }
                .into(),
            )),
            (ReviewState::Published { .. }, ReviewCommand::MarkAsPublished { .. }) => Ok(None),
            (state, ReviewCommand::MarkAsPublished { .. }) => {
                Err(DomainError::invalid_transition(state.name(), "Published"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_handlers::{CommandError, CommandRunner};
    use crate::infrastructure::event_store::EventStore;
    use crate::infrastructure::in_memory_event_store::InMemoryEventStore;
    use std::sync::Arc;
    use test_case::test_case;

    fn doi() -> Doi {
        Doi::parse("10.1101/2021.06.18.448882").unwrap()
    }

    fn orcid() -> OrcidId {
        OrcidId::parse("0000-0002-1825-0097").unwrap()
    }

    fn draft() -> ReviewDraft {
        ReviewDraft::new(doi(), orcid())
    }

    fn complete_draft() -> ReviewDraft {
        let mut draft = draft();
        draft.text = Some("A careful reading".to_string());
        draft.code_of_conduct_agreed = true;
        draft
    }

    fn published() -> ReviewState {
        ReviewState::Published {
            doi: Doi::parse("10.5281/zenodo.1003150").unwrap(),
        }
    }

    fn enter_text(text: &str) -> ReviewCommand {
        ReviewCommand::EnterText {
            review_id: ReviewId::new(),
            text: text.to_string(),
        }
    }

    #[test_case(ReviewState::NotStarted => matches Ok(Some(_)); "not started emits the event")]
    #[test_case(ReviewState::InProgress(draft()) => matches Ok(None); "already started is a no-op")]
    #[test_case(published() => matches Ok(None); "published review is a no-op")]
    fn test_decide_start(state: ReviewState) -> Result<Option<DomainEvent>, DomainError> {
        ReviewCommandHandler.decide(
            &state,
            &ReviewCommand::Start {
                review_id: ReviewId::new(),
                preprint: doi(),
                author: orcid(),
            },
        )
    }

    #[test_case(ReviewState::InProgress(draft()) => matches Ok(Some(_)); "first text commits")]
    #[test_case(ReviewState::NotStarted => matches Err(DomainError::InvalidStateTransition { .. }); "missing review cannot take text")]
    #[test_case(ReviewState::PublicationRequested(complete_draft()) => matches Err(DomainError::InvalidStateTransition { .. }); "frozen draft cannot take text")]
    #[test_case(published() => matches Err(DomainError::InvalidStateTransition { .. }); "published review cannot take text")]
    fn test_decide_enter_text(state: ReviewState) -> Result<Option<DomainEvent>, DomainError> {
        ReviewCommandHandler.decide(&state, &enter_text("A careful reading"))
    }

    /// Test identical text is a no-op while different text replaces
    #[test]
    fn test_enter_text_replaces() {
        let handler = ReviewCommandHandler;
        let mut with_text = draft();
        with_text.text = Some("First pass".to_string());
        let state = ReviewState::InProgress(with_text);

        let same = handler.decide(&state, &enter_text("First pass")).unwrap();
        assert!(same.is_none());

        let replaced = handler.decide(&state, &enter_text("Second pass")).unwrap();
        assert!(matches!(
            replaced,
            Some(DomainEvent::ReviewTextEntered(ReviewTextEntered { text, .. })) if text == "Second pass"
        ));
    }

    /// Test the code of conduct agreement is idempotent
    #[test]
    fn test_agree_to_code_of_conduct_idempotent() {
        let handler = ReviewCommandHandler;
        let command = ReviewCommand::AgreeToCodeOfConduct {
            review_id: ReviewId::new(),
        };

        let first = handler
            .decide(&ReviewState::InProgress(draft()), &command)
            .unwrap();
        assert!(first.is_some());

        let mut agreed = draft();
        agreed.code_of_conduct_agreed = true;
        let second = handler
            .decide(&ReviewState::InProgress(agreed), &command)
            .unwrap();
        assert!(second.is_none());
    }

    /// Test an unchanged declaration is a no-op while a new one commits
    #[test]
    fn test_declare_competing_interests() {
        let handler = ReviewCommandHandler;
        let mut declared = draft();
        declared.competing_interests = Some(CompetingInterests { statement: None });
        let state = ReviewState::InProgress(declared);

        let same = handler
            .decide(
                &state,
                &ReviewCommand::DeclareCompetingInterests {
                    review_id: ReviewId::new(),
                    statement: None,
                },
            )
            .unwrap();
        assert!(same.is_none());

        let changed = handler
            .decide(
                &state,
                &ReviewCommand::DeclareCompetingInterests {
                    review_id: ReviewId::new(),
                    statement: Some("I know the author".to_string()),
                },
            )
            .unwrap();
        assert!(changed.is_some());
    }

    #[test_case(ReviewState::InProgress(complete_draft()) => matches Ok(Some(_)); "complete draft may request")]
    #[test_case(ReviewState::PublicationRequested(complete_draft()) => matches Ok(None); "requesting twice is a no-op")]
    #[test_case(published() => matches Ok(None); "published review is a no-op")]
    #[test_case(ReviewState::NotStarted => matches Err(DomainError::InvalidStateTransition { .. }); "missing review cannot request")]
    fn test_decide_request_publication(
        state: ReviewState,
    ) -> Result<Option<DomainEvent>, DomainError> {
        ReviewCommandHandler.decide(
            &state,
            &ReviewCommand::RequestPublication {
                review_id: ReviewId::new(),
            },
        )
    }

    /// Test publication refuses incomplete drafts, naming what is missing
    #[test]
    fn test_request_publication_incomplete() {
        let handler = ReviewCommandHandler;
        let command = ReviewCommand::RequestPublication {
            review_id: ReviewId::new(),
        };

        let err = handler
            .decide(&ReviewState::InProgress(draft()), &command)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::IncompleteReview {
                missing: "review text and code of conduct agreement".to_string(),
            }
        );

        let mut text_only = draft();
        text_only.text = Some("A careful reading".to_string());
        let err = handler
            .decide(&ReviewState::InProgress(text_only), &command)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::IncompleteReview {
                missing: "code of conduct agreement".to_string(),
            }
        );
    }

    #[test_case(ReviewState::PublicationRequested(complete_draft()) => matches Ok(Some(_)); "requested review publishes")]
    #[test_case(published() => matches Ok(None); "publishing twice is a no-op")]
    #[test_case(ReviewState::InProgress(complete_draft()) => matches Err(DomainError::InvalidStateTransition { .. }); "draft cannot publish directly")]
    #[test_case(ReviewState::NotStarted => matches Err(DomainError::InvalidStateTransition { .. }); "missing review cannot publish")]
    fn test_decide_mark_as_published(
        state: ReviewState,
    ) -> Result<Option<DomainEvent>, DomainError> {
        ReviewCommandHandler.decide(
            &state,
            &ReviewCommand::MarkAsPublished {
                review_id: ReviewId::new(),
                doi: Doi::parse("10.5281/zenodo.1003150").unwrap(),
            },
        )
    }

    /// Test the fold rebuilds a draft from its events
    #[test]
    fn test_evolve_rebuilds_draft() {
        let handler = ReviewCommandHandler;
        let review_id = ReviewId::new();

        let events: Vec<DomainEvent> = vec![
            ReviewStarted {
                review_id,
                preprint: doi(),
                author: orcid(),
            }
            .into(),
            ReviewTextEntered {
                review_id,
                text: "First pass".to_string(),
            }
            .into(),
            ReviewTextEntered {
                review_id,
                text: "Second pass".to_string(),
            }
            .into(),
            CodeOfConductAgreed { review_id }.into(),
        ];

        let state = events
            .iter()
            .fold(handler.initial_state(), |s, e| handler.evolve(s, e));

        // The latest text wins
        let ReviewState::InProgress(draft) = state else {
            panic!("expected an in-progress review");
        };
        assert_eq!(draft.text.as_deref(), Some("Second pass"));
        assert!(draft.code_of_conduct_agreed);
        assert!(draft.competing_interests.is_none());
    }

    /// Test the full path from start to publication through the runner
    #[tokio::test]
    async fn test_review_lifecycle_through_runner() {
        let runner = CommandRunner::new(Arc::new(InMemoryEventStore::new()));
        let handler = ReviewCommandHandler;
        let review_id = ReviewId::new();

        runner
            .run(
                &handler,
                ReviewCommand::Start {
                    review_id,
                    preprint: doi(),
                    author: orcid(),
                },
            )
            .await
            .unwrap();

        // Publication needs text and the code of conduct first
        let err = runner
            .run(&handler, ReviewCommand::RequestPublication { review_id })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Domain(DomainError::IncompleteReview { .. })
        ));

        runner
            .run(
                &handler,
                ReviewCommand::EnterText {
                    review_id,
                    text: "A careful reading".to_string(),
                },
            )
            .await
            .unwrap();
        runner
            .run(&handler, ReviewCommand::AgreeToCodeOfConduct { review_id })
            .await
            .unwrap();
        runner
            .run(&handler, ReviewCommand::RequestPublication { review_id })
            .await
            .unwrap();

        // The frozen draft refuses edits
        let err = runner
            .run(
                &handler,
                ReviewCommand::EnterText {
                    review_id,
                    text: "Another pass".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Domain(DomainError::InvalidStateTransition { .. })
        ));

        runner
            .run(
                &handler,
                ReviewCommand::MarkAsPublished {
                    review_id,
                    doi: Doi::parse("10.5281/zenodo.1003150").unwrap(),
                },
            )
            .await
            .unwrap();

        let log = runner.store().all().await.unwrap();
        assert_eq!(log.len(), 5);

        // The final fold lands on Published
        let state = log
            .iter()
            .fold(handler.initial_state(), |s, e| handler.evolve(s, &e.event));
        assert!(state.is_published());
    }
}
