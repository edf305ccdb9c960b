// Copyright 2025 Cowboy AI, LLC.

//! Read model projections
//!
//! Projections are optimized read models updated from dispatched events.
//! They answer queries without replaying history on every call. Each one
//! implements [`StatefulQuery`](crate::query_handlers::StatefulQuery) and
//! runs under a
//! [`StatefulQueryHandle`](crate::query_handlers::StatefulQueryHandle).

pub mod open_requests;

pub use open_requests::{OpenRequest, OpenRequests, OpenRequestsProjection};
