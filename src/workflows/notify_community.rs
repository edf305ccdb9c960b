//! Announces newly started review requests to the community.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::identifiers::{Doi, RequestId};
use crate::reactions::ReactionError;
use crate::workflows::activities::{CommunityNotifier, RequestNotification};
use crate::workflows::{Workflow, WorkflowName};

/// Payload of the notify-community workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotifyCommunityPayload {
    /// The request to announce.
    pub request_id: RequestId,
    /// The preprint asking for review.
    pub preprint: Doi,
}

/// Tells the community that a preprint is waiting for reviewers.
pub struct NotifyCommunityWorkflow {
    notifier: Arc<dyn CommunityNotifier>,
}

impl NotifyCommunityWorkflow {
    /// Create the workflow around a notifier port.
    pub fn new(notifier: Arc<dyn CommunityNotifier>) -> Self {
        Self { notifier }
    }
}

impl fmt::Debug for NotifyCommunityWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyCommunityWorkflow").finish()
    }
}

#[async_trait]
impl Workflow for NotifyCommunityWorkflow {
    fn name(&self) -> WorkflowName {
        WorkflowName::NotifyCommunity
    }

    async fn run(&self, payload: Value) -> Result<(), ReactionError> {
        let payload: NotifyCommunityPayload =
            serde_json::from_value(payload).map_err(|e| ReactionError::FailedToNotifyCommunity {
                reason: format!("invalid payload: {e}"),
            })?;

        let notification = RequestNotification {
            request_id: payload.request_id,
            preprint: payload.preprint,
        };
        self.notifier
            .notify_new_request(&notification)
            .await
            .map_err(|e| ReactionError::FailedToNotifyCommunity {
                reason: e.to_string(),
            })?;

        info!(
            request_id = %notification.request_id,
            preprint = %notification.preprint,
            "Community notified of new request"
        );
        Ok(())
    }
}
