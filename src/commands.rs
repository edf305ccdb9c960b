//! Domain commands
//!
//! Commands represent requests to change state. They are processed by command
//! handlers which validate business rules and emit events. Commands return
//! only acknowledgments, not data. Use queries for data retrieval.

use crate::identifiers::{Doi, OrcidId, RequestId, ReviewId};
use serde::{Deserialize, Serialize};

/// Commands acting on one review request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReviewRequestCommand {
    /// Ask for a preprint to be reviewed
    Start {
        /// The request to create
        request_id: RequestId,
        /// The preprint to review
        preprint: Doi,
        /// The researcher asking
        requested_by: OrcidId,
    },
    /// Accept an open request
    Accept {
        /// The request to accept
        request_id: RequestId,
    },
    /// Reject an open request
    Reject {
        /// The request to reject
        request_id: RequestId,
        /// Why it was rejected, when given
        reason: Option<String>,
    },
}

impl ReviewRequestCommand {
    /// The request this command acts on
    pub fn request_id(&self) -> RequestId {
        match self {
            ReviewRequestCommand::Start { request_id, .. }
            | ReviewRequestCommand::Accept { request_id }
            | ReviewRequestCommand::Reject { request_id, .. } => *request_id,
        }
    }
}

/// Commands acting on one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReviewCommand {
    /// Start writing a review of a preprint
    Start {
        /// The review to create
        review_id: ReviewId,
        /// The preprint under review
        preprint: Doi,
        /// The researcher writing the review
        author: OrcidId,
    },
    /// Enter the review text, replacing any earlier text
    EnterText {
        /// The review to change
        review_id: ReviewId,
        /// The full review text
        text: String,
    },
    /// Agree to the code of conduct
    AgreeToCodeOfConduct {
        /// The review the agreement covers
        review_id: ReviewId,
    },
    /// Declare competing interests
    DeclareCompetingInterests {
        /// The review the declaration covers
        review_id: ReviewId,
        /// The declaration text; `None` means none to declare
        statement: Option<String>,
    },
    /// Ask for the review to be published
    RequestPublication {
        /// The review to publish
        review_id: ReviewId,
    },
    /// Record that the review was published under a DOI
    MarkAsPublished {
        /// The review that was published
        review_id: ReviewId,
        /// The DOI the published review received
        doi: Doi,
    },
}

impl ReviewCommand {
    /// The review this command acts on
    pub fn review_id(&self) -> ReviewId {
        match self {
            ReviewCommand::Start { review_id, .. }
            | ReviewCommand::EnterText { review_id, .. }
            | ReviewCommand::AgreeToCodeOfConduct { review_id }
            | ReviewCommand::DeclareCompetingInterests { review_id, .. }
            | ReviewCommand::RequestPublication { review_id }
            | ReviewCommand::MarkAsPublished { review_id, .. } => *review_id,
        }
    }
}
