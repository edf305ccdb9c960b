//! Workflows triggered by domain events
//!
//! A workflow is a named unit of reaction logic. The reaction engine hands
//! triggers to a [`WorkflowEngine`], which guarantees at most one logical
//! execution per `(workflow, idempotency key)` pair. Workflows themselves
//! only orchestrate [`activities`]; all side effects live behind those
//! ports.
//!
//! ```mermaid
//! flowchart LR
//!     T[WorkflowTrigger] --> E[WorkflowEngine]
//!     E -->|"dedup by (name, key)"| W[Workflow::run]
//!     W --> A[activity ports]
//! ```

pub mod activities;
pub mod classify_preprint;
pub mod notify_community;
pub mod publish_review;

pub use classify_preprint::{ClassifyPreprintPayload, ClassifyPreprintWorkflow};
pub use notify_community::{NotifyCommunityPayload, NotifyCommunityWorkflow};
pub use publish_review::{PublishReviewPayload, PublishReviewWorkflow};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::reactions::ReactionError;

/// Names of the workflows the reaction rules can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum WorkflowName {
    /// Classify the preprint behind a new review request.
    ClassifyPreprint,
    /// Announce a new review request to the community.
    NotifyCommunity,
    /// Deposit a review and confirm its publication.
    PublishReview,
}

impl WorkflowName {
    /// Kebab-case name used in logs and idempotency keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowName::ClassifyPreprint => "classify-preprint",
            WorkflowName::NotifyCommunity => "notify-community",
            WorkflowName::PublishReview => "publish-review",
        }
    }
}

impl fmt::Display for WorkflowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors surfaced by a workflow engine.
#[derive(Debug, Error)]
pub enum WorkflowEngineError {
    /// No workflow is registered under the requested name.
    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(WorkflowName),

    /// The workflow ran and failed.
    #[error(transparent)]
    Reaction(#[from] ReactionError),

    /// The engine itself could not be reached.
    #[error("Workflow engine unavailable: {0}")]
    Unavailable(String),
}

/// A named unit of reaction logic.
///
/// Implementations deserialize their own payload and orchestrate
/// [`activities`] ports. A malformed payload is reported as the
/// workflow's own failure, not a panic.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// The name the engine registers this workflow under.
    fn name(&self) -> WorkflowName;

    /// Execute the workflow against its serialized payload.
    async fn run(&self, payload: Value) -> Result<(), ReactionError>;
}

/// Executes named workflows with at-most-one semantics per key.
///
/// The reaction engine may hand over the same trigger more than once;
/// implementations must make the duplicate a no-op.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Execute `name` with `payload`, at most once per `idempotency_key`.
    async fn execute(
        &self,
        name: WorkflowName,
        payload: Value,
        idempotency_key: String,
    ) -> Result<(), WorkflowEngineError>;
}

/// Workflow engine that runs workflows inside the current process.
///
/// Suitable for tests and single-node deployments. Deduplication is
/// in-memory only; a restart forgets which keys already ran. Durable
/// execution belongs to an external engine behind the same trait.
pub struct InProcessWorkflowEngine {
    workflows: HashMap<WorkflowName, Arc<dyn Workflow>>,
    executed: Mutex<HashSet<(WorkflowName, String)>>,
}

impl InProcessWorkflowEngine {
    /// Create an engine with no workflows registered.
    pub fn new() -> Self {
        Self {
            workflows: HashMap::new(),
            executed: Mutex::new(HashSet::new()),
        }
    }

    /// Register a workflow under its own name, replacing any previous one.
    pub fn register(mut self, workflow: Arc<dyn Workflow>) -> Self {
        self.workflows.insert(workflow.name(), workflow);
        self
    }
}

impl Default for InProcessWorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InProcessWorkflowEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessWorkflowEngine")
            .field("workflows", &self.workflows.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl WorkflowEngine for InProcessWorkflowEngine {
    async fn execute(
        &self,
        name: WorkflowName,
        payload: Value,
        idempotency_key: String,
    ) -> Result<(), WorkflowEngineError> {
        let workflow = self
            .workflows
            .get(&name)
            .ok_or(WorkflowEngineError::UnknownWorkflow(name))?;

        // The key is reserved before the run. A failed run keeps its key,
        // so a redelivered trigger does not retry the workflow.
        {
            let mut executed = self.executed.lock().await;
            if !executed.insert((name, idempotency_key.clone())) {
                debug!(workflow = %name, key = %idempotency_key, "Duplicate trigger ignored");
                return Ok(());
            }
        }

        info!(workflow = %name, key = %idempotency_key, "Executing workflow");
        workflow.run(payload).await?;
        Ok(())
    }
}
