// Copyright (c) 2025 - Cowboy AI, LLC.

//! Reactions: committed events that trigger workflows
//!
//! The reaction rules are one pure table mapping a committed event to the
//! workflow triggers it causes. The [`ReactionEngine`] subscribes to the
//! dispatcher and hands each trigger to a [`WorkflowEngine`], fire and
//! forget. A failed workflow is logged and never stops the loop; each
//! trigger carries a deterministic idempotency key so the engine can drop
//! duplicates.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::events::DomainEvent;
use crate::infrastructure::{EventDispatcher, StoredEvent};
use crate::workflows::{
    ClassifyPreprintPayload, NotifyCommunityPayload, PublishReviewPayload, WorkflowEngine,
    WorkflowName,
};

/// A reaction's workflow execution failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactionError {
    /// The classify-preprint workflow failed.
    #[error("Failed to classify preprint: {reason}")]
    FailedToClassifyPreprint {
        /// What went wrong.
        reason: String,
    },

    /// The notify-community workflow failed.
    #[error("Failed to notify the community: {reason}")]
    FailedToNotifyCommunity {
        /// What went wrong.
        reason: String,
    },

    /// The publish-review workflow failed.
    #[error("Failed to publish the review: {reason}")]
    FailedToPublishReview {
        /// What went wrong.
        reason: String,
    },
}

/// One workflow execution requested by the reaction rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTrigger {
    /// The workflow to execute.
    pub workflow: WorkflowName,
    /// Serialized payload the workflow deserializes itself.
    pub payload: Value,
    /// Deterministic key giving the execution at-most-once semantics.
    pub idempotency_key: String,
}

/// The reaction rules.
///
/// Pure and total: every committed event maps to the complete list of
/// workflow triggers it causes, most events to none. Running the same
/// event through twice yields triggers with identical idempotency keys,
/// which is what lets the workflow engine drop redeliveries.
pub fn reactions_for(event: &StoredEvent) -> Vec<WorkflowTrigger> {
    match &event.event {
        DomainEvent::ReviewRequestStarted(started) => vec![
            WorkflowTrigger {
                workflow: WorkflowName::ClassifyPreprint,
                payload: serde_json::to_value(ClassifyPreprintPayload {
                    request_id: started.request_id,
                    preprint: started.preprint.clone(),
                })
                .unwrap_or(Value::Null),
                idempotency_key: format!("classify-preprint:{}", started.request_id),
            },
            WorkflowTrigger {
                workflow: WorkflowName::NotifyCommunity,
                payload: serde_json::to_value(NotifyCommunityPayload {
                    request_id: started.request_id,
                    preprint: started.preprint.clone(),
                })
                .unwrap_or(Value::Null),
                idempotency_key: format!("notify-community:{}", started.request_id),
            },
        ],
        DomainEvent::ReviewPublicationRequested(requested) => vec![WorkflowTrigger {
            workflow: WorkflowName::PublishReview,
            payload: serde_json::to_value(PublishReviewPayload {
                review_id: requested.review_id,
            })
            .unwrap_or(Value::Null),
            idempotency_key: format!("publish-review:{}", requested.review_id),
        }],
        DomainEvent::ReviewRequestAccepted(_)
        | DomainEvent::ReviewRequestRejected(_)
        | DomainEvent::ReviewStarted(_)
        | DomainEvent::ReviewTextEntered(_)
        | DomainEvent::CodeOfConductAgreed(_)
        | DomainEvent::CompetingInterestsDeclared(_)
        | DomainEvent::ReviewPublished(_) => Vec::new(),
    }
}

/// Drives the reaction rules against the live event feed.
#[derive(Debug, Clone, Copy)]
pub struct ReactionEngine;

impl ReactionEngine {
    /// Subscribe to the dispatcher and start reacting.
    ///
    /// Each trigger runs on its own task so one slow workflow never
    /// delays the next event. Workflow failures are logged and dropped;
    /// durability against process loss belongs to the workflow engine.
    pub fn spawn(
        dispatcher: &EventDispatcher,
        engine: Arc<dyn WorkflowEngine>,
    ) -> ReactionEngineHandle {
        let mut subscription = dispatcher.subscribe();
        let (shutdown, mut shutdown_seen) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_seen.changed() => break,
                    event = subscription.recv() => {
                        let Some(event) = event else { break };
                        for trigger in reactions_for(&event) {
                            let engine = Arc::clone(&engine);
                            info!(
                                token = %event.token,
                                workflow = %trigger.workflow,
                                key = %trigger.idempotency_key,
                                "Dispatching reaction"
                            );
                            tokio::spawn(async move {
                                let workflow = trigger.workflow;
                                let key = trigger.idempotency_key.clone();
                                if let Err(error) = engine
                                    .execute(trigger.workflow, trigger.payload, trigger.idempotency_key)
                                    .await
                                {
                                    warn!(workflow = %workflow, key = %key, %error, "Reaction workflow failed");
                                }
                            });
                        }
                    }
                }
            }
        });

        ReactionEngineHandle { shutdown, task }
    }
}

/// Handle to a running reaction loop.
///
/// Dropping the handle aborts the loop. Either way, workflow executions
/// already handed to the engine are not cancelled or waited on.
#[derive(Debug)]
pub struct ReactionEngineHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReactionEngineHandle {
    /// Stop consuming events. In-flight workflow executions keep running.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Whether the reaction loop is still consuming events.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ReactionEngineHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
