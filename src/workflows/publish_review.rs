//! Deposits a review with the archive and confirms the publication.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::identifiers::ReviewId;
use crate::reactions::ReactionError;
use crate::workflows::activities::{
    PublicationConfirmation, ReviewDeposit, ReviewDepositor, ReviewMailer,
};
use crate::workflows::{Workflow, WorkflowName};

/// Payload of the publish-review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PublishReviewPayload {
    /// The review to publish.
    pub review_id: ReviewId,
}

/// Publishes a review whose author asked for publication.
///
/// Activities run in order: the review is deposited first, then the
/// confirmation mail goes out with the minted DOI. A deposit failure
/// stops the workflow before any mail is sent.
pub struct PublishReviewWorkflow {
    depositor: Arc<dyn ReviewDepositor>,
    mailer: Arc<dyn ReviewMailer>,
}

impl PublishReviewWorkflow {
    /// Create the workflow around its depositor and mailer ports.
    pub fn new(depositor: Arc<dyn ReviewDepositor>, mailer: Arc<dyn ReviewMailer>) -> Self {
        Self { depositor, mailer }
    }
}

impl fmt::Debug for PublishReviewWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishReviewWorkflow").finish()
    }
}

#[async_trait]
impl Workflow for PublishReviewWorkflow {
    fn name(&self) -> WorkflowName {
        WorkflowName::PublishReview
    }

    async fn run(&self, payload: Value) -> Result<(), ReactionError> {
        let payload: PublishReviewPayload =
            serde_json::from_value(payload).map_err(|e| ReactionError::FailedToPublishReview {
                reason: format!("invalid payload: {e}"),
            })?;

        let deposit = ReviewDeposit {
            review_id: payload.review_id,
        };
        let receipt = self.depositor.deposit(&deposit).await.map_err(|e| {
            ReactionError::FailedToPublishReview {
                reason: e.to_string(),
            }
        })?;

        let confirmation = PublicationConfirmation {
            review_id: payload.review_id,
            doi: receipt.doi,
        };
        self.mailer
            .send_publication_confirmation(&confirmation)
            .await
            .map_err(|e| ReactionError::FailedToPublishReview {
                reason: e.to_string(),
            })?;

        info!(
            review_id = %confirmation.review_id,
            doi = %confirmation.doi,
            "Review deposited and confirmation sent"
        );
        Ok(())
    }
}
