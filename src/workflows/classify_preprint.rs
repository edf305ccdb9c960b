//! Classifies the preprint behind a newly started review request.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::identifiers::{Doi, RequestId};
use crate::reactions::ReactionError;
use crate::workflows::activities::PreprintClassifier;
use crate::workflows::{Workflow, WorkflowName};

/// Payload of the classify-preprint workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassifyPreprintPayload {
    /// The request that asked for the classification.
    pub request_id: RequestId,
    /// The preprint to classify.
    pub preprint: Doi,
}

/// Looks up the subject fields of the preprint behind a request.
///
/// The classification result stays with the classifier adapter; the
/// workflow only guarantees that classification was attempted once per
/// request.
pub struct ClassifyPreprintWorkflow {
    classifier: Arc<dyn PreprintClassifier>,
}

impl ClassifyPreprintWorkflow {
    /// Create the workflow around a classifier port.
    pub fn new(classifier: Arc<dyn PreprintClassifier>) -> Self {
        Self { classifier }
    }
}

impl fmt::Debug for ClassifyPreprintWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifyPreprintWorkflow").finish()
    }
}

#[async_trait]
impl Workflow for ClassifyPreprintWorkflow {
    fn name(&self) -> WorkflowName {
        WorkflowName::ClassifyPreprint
    }

    async fn run(&self, payload: Value) -> Result<(), ReactionError> {
        let payload: ClassifyPreprintPayload =
            serde_json::from_value(payload).map_err(|e| ReactionError::FailedToClassifyPreprint {
                reason: format!("invalid payload: {e}"),
            })?;

        let classification = self
            .classifier
            .classify(&payload.preprint)
            .await
            .map_err(|e| ReactionError::FailedToClassifyPreprint {
                reason: e.to_string(),
            })?;

        info!(
            request_id = %payload.request_id,
            preprint = %payload.preprint,
            fields = ?classification.fields,
            "Preprint classified"
        );
        Ok(())
    }
}
