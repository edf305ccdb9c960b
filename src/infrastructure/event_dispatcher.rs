//! In-process dispatch of committed events
//!
//! A broadcast channel fans committed events out to subscribers. Delivery
//! per subscriber follows commit order; a subscription only sees events
//! committed after it was taken. Nothing is persisted and nothing crosses
//! process boundaries.

use crate::infrastructure::event_store::StoredEvent;
use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

/// Channel capacity for broadcast.
const CHANNEL_CAPACITY: usize = 1024;

/// Cloneable handle for publishing committed events in-process
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<StoredEvent>,
}

impl EventDispatcher {
    /// Create a dispatcher with the default buffer capacity
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// Create a dispatcher with an explicit buffer capacity
    ///
    /// Small capacities make slow subscribers lag sooner; see
    /// [`EventSubscription::recv`] for how lag is handled.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe from this point forward
    ///
    /// Events committed before the subscription are never delivered.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish a committed event to all current subscribers
    ///
    /// Publishing with no subscribers is a no-op.
    pub fn publish(&self, event: &StoredEvent) {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                debug!(token = %event.token, receivers, "Dispatched committed event");
            }
            Err(_) => {
                debug!(token = %event.token, "Dispatched committed event (no subscribers)");
            }
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the committed event sequence
pub struct EventSubscription {
    receiver: broadcast::Receiver<StoredEvent>,
}

impl EventSubscription {
    /// Next committed event, in commit order
    ///
    /// Returns `None` once every dispatcher handle is dropped. A lagged
    /// subscriber (buffer overrun) logs the missed count and resumes with
    /// the oldest event still buffered.
    pub async fn recv(&mut self) -> Option<StoredEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscription lagged, events were dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Adapt the subscription into a `Stream` of committed events
    pub fn into_stream(self) -> impl Stream<Item = StoredEvent> {
        BroadcastStream::new(self.receiver).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "Event subscription lagged, events were dropped");
                None
            }
        })
    }
}
