//! Open review requests projection
//!
//! Provides a live view of the requests still waiting for a decision.

use crate::events::DomainEvent;
use crate::identifiers::{Doi, RequestId};
use crate::infrastructure::event_store::StoredEvent;
use crate::query_handlers::StatefulQuery;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An open review request awaiting a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OpenRequest {
    /// The request's identifier
    pub request_id: RequestId,
    /// The preprint the request is about
    pub preprint: Doi,
    /// When the request was started
    pub since: DateTime<Utc>,
}

/// The open requests, in arrival order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenRequests {
    requests: IndexMap<RequestId, OpenRequest>,
}

impl OpenRequests {
    /// The open requests, oldest first
    pub fn open_requests(&self) -> Vec<OpenRequest> {
        self.requests.values().cloned().collect()
    }

    /// Whether the request is still waiting for a decision
    pub fn is_open(&self, request_id: RequestId) -> bool {
        self.requests.contains_key(&request_id)
    }

    /// How many requests are open
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether no request is waiting
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Maintains the set of requests still waiting for a decision
///
/// Started requests enter the set; accepting or rejecting removes them.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRequestsProjection;

impl StatefulQuery for OpenRequestsProjection {
    type State = OpenRequests;

    fn initial_state(&self) -> Self::State {
        OpenRequests::default()
    }

    fn update(&self, state: &mut Self::State, event: &StoredEvent) {
        match &event.event {
            DomainEvent::ReviewRequestStarted(e) => {
                state.requests.insert(
                    e.request_id,
                    OpenRequest {
                        request_id: e.request_id,
                        preprint: e.preprint.clone(),
                        since: event.stored_at,
                    },
                );
            }
            DomainEvent::ReviewRequestAccepted(e) => {
                // shift_remove keeps the remaining arrival order intact
                state.requests.shift_remove(&e.request_id);
            }
            DomainEvent::ReviewRequestRejected(e) => {
                state.requests.shift_remove(&e.request_id);
            }
            // Review events do not affect the open set
            DomainEvent::ReviewStarted(_)
            | DomainEvent::ReviewTextEntered(_)
            | DomainEvent::CodeOfConductAgreed(_)
            | DomainEvent::CompetingInterestsDeclared(_)
            | DomainEvent::ReviewPublicationRequested(_)
            | DomainEvent::ReviewPublished(_) => {}
        }
    }
}
