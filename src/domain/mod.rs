// Copyright 2025 Cowboy AI, LLC.

//! Domain aggregates
//!
//! Each aggregate is a pure state machine over its slice of the event log:
//! a filter naming its events, a fold rebuilding state, and a decision
//! table over (state, command).

pub mod review;
pub mod review_request;

pub use review::{
    review_events, CompetingInterests, ReviewCommandHandler, ReviewDraft, ReviewState,
};
pub use review_request::{request_events, ReviewRequestCommandHandler, ReviewRequestState};
