// Copyright 2025 Cowboy AI, LLC.

//! The domain event catalog
//!
//! One closed enum wraps every event the platform records. The catalog is
//! deliberately a sum type rather than a trait object: adding an event is a
//! compiler-checked change at every match site (folds, reactions,
//! projections).

use crate::identifiers::{Doi, OrcidId, RequestId, ReviewId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Tag identifying one event kind in the catalog
///
/// The wire tag (`as_str`) matches the variant name and is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum EventType {
    /// A researcher asked for a preprint to be reviewed
    ReviewRequestStarted,
    /// A review request was accepted
    ReviewRequestAccepted,
    /// A review request was rejected
    ReviewRequestRejected,
    /// A researcher started writing a review
    ReviewStarted,
    /// Review text was entered or replaced
    ReviewTextEntered,
    /// The author agreed to the code of conduct
    CodeOfConductAgreed,
    /// The author declared competing interests
    CompetingInterestsDeclared,
    /// The author asked for the review to be published
    ReviewPublicationRequested,
    /// The review was published and assigned a DOI
    ReviewPublished,
}

impl EventType {
    /// Every tag in the catalog, in declaration order
    pub const ALL: [EventType; 9] = [
        EventType::ReviewRequestStarted,
        EventType::ReviewRequestAccepted,
        EventType::ReviewRequestRejected,
        EventType::ReviewStarted,
        EventType::ReviewTextEntered,
        EventType::CodeOfConductAgreed,
        EventType::CompetingInterestsDeclared,
        EventType::ReviewPublicationRequested,
        EventType::ReviewPublished,
    ];

    /// The stable wire tag for this event kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ReviewRequestStarted => "ReviewRequestStarted",
            EventType::ReviewRequestAccepted => "ReviewRequestAccepted",
            EventType::ReviewRequestRejected => "ReviewRequestRejected",
            EventType::ReviewStarted => "ReviewStarted",
            EventType::ReviewTextEntered => "ReviewTextEntered",
            EventType::CodeOfConductAgreed => "CodeOfConductAgreed",
            EventType::CompetingInterestsDeclared => "CompetingInterestsDeclared",
            EventType::ReviewPublicationRequested => "ReviewPublicationRequested",
            EventType::ReviewPublished => "ReviewPublished",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enum wrapper for all domain events
///
/// Serializes internally tagged: `{"tag": "<EventType>", ...payload fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "tag")]
pub enum DomainEvent {
    // Review request events
    /// A researcher asked for a preprint to be reviewed
    ReviewRequestStarted(ReviewRequestStarted),
    /// A review request was accepted
    ReviewRequestAccepted(ReviewRequestAccepted),
    /// A review request was rejected
    ReviewRequestRejected(ReviewRequestRejected),

    // Review events
    /// A researcher started writing a review
    ReviewStarted(ReviewStarted),
    /// Review text was entered or replaced
    ReviewTextEntered(ReviewTextEntered),
    /// The author agreed to the code of conduct
    CodeOfConductAgreed(CodeOfConductAgreed),
    /// The author declared competing interests
    CompetingInterestsDeclared(CompetingInterestsDeclared),
    /// The author asked for the review to be published
    ReviewPublicationRequested(ReviewPublicationRequested),
    /// The review was published and assigned a DOI
    ReviewPublished(ReviewPublished),
}

impl DomainEvent {
    /// The tag of this event
    pub fn event_type(&self) -> EventType {
        match self {
            DomainEvent::ReviewRequestStarted(_) => EventType::ReviewRequestStarted,
            DomainEvent::ReviewRequestAccepted(_) => EventType::ReviewRequestAccepted,
            DomainEvent::ReviewRequestRejected(_) => EventType::ReviewRequestRejected,
            DomainEvent::ReviewStarted(_) => EventType::ReviewStarted,
            DomainEvent::ReviewTextEntered(_) => EventType::ReviewTextEntered,
            DomainEvent::CodeOfConductAgreed(_) => EventType::CodeOfConductAgreed,
            DomainEvent::CompetingInterestsDeclared(_) => EventType::CompetingInterestsDeclared,
            DomainEvent::ReviewPublicationRequested(_) => EventType::ReviewPublicationRequested,
            DomainEvent::ReviewPublished(_) => EventType::ReviewPublished,
        }
    }

    /// The payload as a JSON object, for field predicate matching
    ///
    /// Payload structs are plain data; serializing them cannot fail, so a
    /// failure degrades to `Null` (which no predicate matches).
    pub fn payload_value(&self) -> Value {
        let value = match self {
            DomainEvent::ReviewRequestStarted(p) => serde_json::to_value(p),
            DomainEvent::ReviewRequestAccepted(p) => serde_json::to_value(p),
            DomainEvent::ReviewRequestRejected(p) => serde_json::to_value(p),
            DomainEvent::ReviewStarted(p) => serde_json::to_value(p),
            DomainEvent::ReviewTextEntered(p) => serde_json::to_value(p),
            DomainEvent::CodeOfConductAgreed(p) => serde_json::to_value(p),
            DomainEvent::CompetingInterestsDeclared(p) => serde_json::to_value(p),
            DomainEvent::ReviewPublicationRequested(p) => serde_json::to_value(p),
            DomainEvent::ReviewPublished(p) => serde_json::to_value(p),
        };
        value.unwrap_or(Value::Null)
    }
}

// Review request event structs

/// Review request started event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewRequestStarted {
    /// The unique identifier of the request
    pub request_id: RequestId,
    /// The preprint the request is about
    pub preprint: Doi,
    /// The researcher who asked for the review
    pub requested_by: OrcidId,
}

/// Review request accepted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewRequestAccepted {
    /// The request that was accepted
    pub request_id: RequestId,
}

/// Review request rejected event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewRequestRejected {
    /// The request that was rejected
    pub request_id: RequestId,
    /// Why the request was rejected, when given
    pub reason: Option<String>,
}

// Review event structs

/// Review started event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewStarted {
    /// The unique identifier of the review
    pub review_id: ReviewId,
    /// The preprint under review
    pub preprint: Doi,
    /// The researcher writing the review
    pub author: OrcidId,
}

/// Review text entered event
///
/// Entering text again replaces the earlier text; the latest event wins
/// when folding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewTextEntered {
    /// The review the text belongs to
    pub review_id: ReviewId,
    /// The full review text
    pub text: String,
}

/// Code of conduct agreed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CodeOfConductAgreed {
    /// The review the agreement covers
    pub review_id: ReviewId,
}

/// Competing interests declared event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompetingInterestsDeclared {
    /// The review the declaration covers
    pub review_id: ReviewId,
    /// The declaration text; `None` means none were declared
    pub statement: Option<String>,
}

/// Review publication requested event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewPublicationRequested {
    /// The review to publish
    pub review_id: ReviewId,
}

/// Review published event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewPublished {
    /// The review that was published
    pub review_id: ReviewId,
    /// The DOI assigned to the published review
    pub doi: Doi,
}

impl From<ReviewRequestStarted> for DomainEvent {
    fn from(event: ReviewRequestStarted) -> Self {
        DomainEvent::ReviewRequestStarted(event)
    }
}

impl From<ReviewRequestAccepted> for DomainEvent {
    fn from(event: ReviewRequestAccepted) -> Self {
        DomainEvent::ReviewRequestAccepted(event)
    }
}

impl From<ReviewRequestRejected> for DomainEvent {
    fn from(event: ReviewRequestRejected) -> Self {
        DomainEvent::ReviewRequestRejected(event)
    }
}

impl From<ReviewStarted> for DomainEvent {
    fn from(event: ReviewStarted) -> Self {
        DomainEvent::ReviewStarted(event)
    }
}

impl From<ReviewTextEntered> for DomainEvent {
    fn from(event: ReviewTextEntered) -> Self {
        DomainEvent::ReviewTextEntered(event)
    }
}

impl From<CodeOfConductAgreed> for DomainEvent {
    fn from(event: CodeOfConductAgreed) -> Self {
        DomainEvent::CodeOfConductAgreed(event)
    }
}

impl From<CompetingInterestsDeclared> for DomainEvent {
    fn from(event: CompetingInterestsDeclared) -> Self {
        DomainEvent::CompetingInterestsDeclared(event)
    }
}

impl From<ReviewPublicationRequested> for DomainEvent {
    fn from(event: ReviewPublicationRequested) -> Self {
        DomainEvent::ReviewPublicationRequested(event)
    }
}

impl From<ReviewPublished> for DomainEvent {
    fn from(event: ReviewPublished) -> Self {
        DomainEvent::ReviewPublished(event)
    }
}
