// Copyright 2025 Cowboy AI, LLC.

//! Infrastructure layer for the review platform
//!
//! This module contains all infrastructure concerns including:
//! - NATS client and JetStream integration
//! - Event store port and implementations
//! - Event dispatch to live subscribers

pub mod event_dispatcher;
pub mod event_store;
pub mod in_memory_event_store;
pub mod jetstream_event_store;
pub mod nats_client;

pub use event_dispatcher::{EventDispatcher, EventSubscription};
pub use event_store::{
    AppendCondition, EventStore, EventStoreError, EventToken, QueriedEvents, StoredEvent,
};
pub use in_memory_event_store::InMemoryEventStore;
pub use jetstream_event_store::{JetStreamConfig, JetStreamEventStore};
pub use nats_client::{NatsAuth, NatsClient, NatsConfig, NatsError};
