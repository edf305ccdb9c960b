// Copyright 2025 Cowboy AI, LLC.

//! Activity ports for workflow side effects
//!
//! Activities are the only place workflows touch the outside world. Each
//! port is one narrow async call with a typed error, so adapters stay
//! small and tests can swap in mocks without standing up real services.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifiers::{Doi, RequestId, ReviewId};

/// The classification service could not classify a preprint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Classification failed: {reason}")]
pub struct ClassificationError {
    /// What the service reported.
    pub reason: String,
}

/// The community channel could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Notification failed: {reason}")]
pub struct NotificationError {
    /// What the channel reported.
    pub reason: String,
}

/// The deposit service rejected or lost a review deposit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Deposit failed: {reason}")]
pub struct DepositError {
    /// What the deposit service reported.
    pub reason: String,
}

/// The mailer could not send a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Mail delivery failed: {reason}")]
pub struct MailError {
    /// What the mailer reported.
    pub reason: String,
}

/// Subject fields a preprint was classified into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PreprintClassification {
    /// Subject fields, most relevant first.
    pub fields: Vec<String>,
}

/// Announcement of a newly started review request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequestNotification {
    /// The request being announced.
    pub request_id: RequestId,
    /// The preprint asking for review.
    pub preprint: Doi,
}

/// A review handed to the deposit service for archiving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewDeposit {
    /// The review to deposit.
    pub review_id: ReviewId,
}

/// Receipt returned by the deposit service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DepositReceipt {
    /// The DOI minted for the deposited review.
    pub doi: Doi,
}

/// Confirmation mail sent once a review is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PublicationConfirmation {
    /// The review that was published.
    pub review_id: ReviewId,
    /// The DOI the review was published under.
    pub doi: Doi,
}

/// Classifies a preprint into subject fields.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreprintClassifier: Send + Sync {
    /// Classify the preprint behind `preprint`.
    async fn classify(&self, preprint: &Doi) -> Result<PreprintClassification, ClassificationError>;
}

/// Announces new review requests to the community.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommunityNotifier: Send + Sync {
    /// Announce `notification` on the community channel.
    async fn notify_new_request(
        &self,
        notification: &RequestNotification,
    ) -> Result<(), NotificationError>;
}

/// Deposits reviews with an archiving service that mints DOIs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewDepositor: Send + Sync {
    /// Deposit `deposit` and return the minted DOI.
    async fn deposit(&self, deposit: &ReviewDeposit) -> Result<DepositReceipt, DepositError>;
}

/// Sends mail about published reviews.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewMailer: Send + Sync {
    /// Confirm a publication to the review author.
    async fn send_publication_confirmation(
        &self,
        confirmation: &PublicationConfirmation,
    ) -> Result<(), MailError>;
}
