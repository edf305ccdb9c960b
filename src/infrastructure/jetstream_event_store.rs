//! JetStream-based event store implementation
//!
//! One stream holds the whole log; the JetStream stream sequence is the
//! event token. Conditional appends evaluate the filter client-side and
//! guard the publish with `expected_last_sequence`, so a racing writer in
//! another process trips the guard and the condition is re-evaluated
//! against the events that actually landed. Unconditional appends publish
//! directly, with no guard and no log read.

use crate::events::DomainEvent;
use crate::filter::EventFilter;
use crate::infrastructure::event_dispatcher::EventDispatcher;
use crate::infrastructure::event_store::{
    AppendCondition, EventStore, EventStoreError, EventToken, QueriedEvents, StoredEvent,
};
use crate::infrastructure::nats_client::NatsError;
use async_nats::jetstream::consumer::{pull::Config as ConsumerConfig, AckPolicy, DeliverPolicy};
use async_nats::jetstream::context::{Publish, PublishErrorKind};
use async_nats::jetstream::{self, Context as JetStreamContext};
use async_nats::Client;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// How often a conditional append re-reads after losing the sequence race
/// to writers whose events do not match its filter.
const APPEND_RETRY_LIMIT: usize = 5;

/// Configuration for the JetStream event store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JetStreamConfig {
    /// Name of the JetStream stream to use
    pub stream_name: String,
    /// Prefix for the event subject (the log publishes to `<prefix>.event`)
    pub subject_prefix: String,
    /// Maximum messages retained by the stream (-1 = unlimited)
    pub max_messages: i64,
}

impl Default for JetStreamConfig {
    fn default() -> Self {
        Self {
            stream_name: "review-log".to_string(),
            subject_prefix: "reviews".to_string(),
            max_messages: -1,
        }
    }
}

/// Wire shape of one committed event; the token is carried by the stream
/// sequence, not the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventRecord {
    event: DomainEvent,
    stored_at: DateTime<Utc>,
}

/// JetStream-backed event store
pub struct JetStreamEventStore {
    context: JetStreamContext,
    stream_name: String,
    subject: String,
    dispatcher: EventDispatcher,
    /// Serializes in-process appends so dispatch order equals commit order
    append_lock: Mutex<()>,
}

impl fmt::Debug for JetStreamEventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JetStreamEventStore")
            .field("stream_name", &self.stream_name)
            .field("subject", &self.subject)
            .finish()
    }
}

impl JetStreamEventStore {
    /// Create the store, creating or updating its stream
    pub async fn new(client: Client, config: JetStreamConfig) -> Result<Self, NatsError> {
        Self::with_dispatcher(client, config, EventDispatcher::new()).await
    }

    /// Create the store publishing committed events to the given dispatcher
    pub async fn with_dispatcher(
        client: Client,
        config: JetStreamConfig,
        dispatcher: EventDispatcher,
    ) -> Result<Self, NatsError> {
        let context = jetstream::new(client);
        let subject = format!("{}.event", config.subject_prefix);

        let stream_config = jetstream::stream::Config {
            name: config.stream_name.clone(),
            subjects: vec![subject.clone()],
            retention: jetstream::stream::RetentionPolicy::Limits,
            storage: jetstream::stream::StorageType::File,
            max_messages: config.max_messages,
            ..Default::default()
        };

        context
            .create_stream(stream_config)
            .await
            .map_err(|e| NatsError::JetStreamError(format!("Failed to create stream: {e}")))?;

        Ok(Self {
            context,
            stream_name: config.stream_name,
            subject,
            dispatcher,
            append_lock: Mutex::new(()),
        })
    }

    /// The dispatcher this store publishes committed events to
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Read the whole log in token order
    async fn read_log(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let stream = self
            .context
            .get_stream(&self.stream_name)
            .await
            .map_err(|e| EventStoreError::FailedToGetEvents(format!("Failed to get stream: {e}")))?;

        let last_sequence = stream.cached_info().state.last_sequence;
        if last_sequence == 0 {
            return Ok(Vec::new());
        }

        let consumer_config = ConsumerConfig {
            durable_name: None, // Ephemeral consumer for reads
            deliver_policy: DeliverPolicy::All,
            ack_policy: AckPolicy::None,
            name: Some(format!("log-reader-{}", Uuid::new_v4())),
            ..Default::default()
        };

        let consumer = stream.create_consumer(consumer_config).await.map_err(|e| {
            EventStoreError::FailedToGetEvents(format!("Failed to create consumer: {e}"))
        })?;

        let mut messages = consumer.messages().await.map_err(|e| {
            EventStoreError::FailedToGetEvents(format!("Failed to get messages: {e}"))
        })?;

        let mut events = Vec::new();
        while let Some(message) = messages.next().await {
            let message = message
                .map_err(|e| EventStoreError::FailedToGetEvents(format!("Stream error: {e}")))?;

            let info = message.info().map_err(|e| {
                EventStoreError::FailedToGetEvents(format!("Missing message info: {e}"))
            })?;

            let record: EventRecord = serde_json::from_slice(&message.payload)
                .map_err(|e| EventStoreError::FailedToGetEvents(format!("Bad payload: {e}")))?;

            events.push(StoredEvent {
                token: EventToken::new(info.stream_sequence),
                event: record.event,
                stored_at: record.stored_at,
            });

            // The consumer keeps waiting for future events; stop at the
            // sequence observed when the read began.
            if info.stream_sequence >= last_sequence {
                break;
            }
        }

        Ok(events)
    }

    /// Dispatch a committed event and hand back its token
    fn committed(&self, sequence: u64, record: &EventRecord) -> EventToken {
        let stored = StoredEvent {
            token: EventToken::new(sequence),
            event: record.event.clone(),
            stored_at: record.stored_at,
        };
        self.dispatcher.publish(&stored);
        debug!(token = %stored.token, tag = %stored.event.event_type(), "Committed event");
        stored.token
    }

    fn condition_violated(log: &[StoredEvent], condition: &AppendCondition) -> bool {
        let last_matching = log
            .iter()
            .rev()
            .find(|stored| condition.filter.matches(&stored.event))
            .map(|stored| stored.token);

        match (last_matching, condition.last_known_event) {
            (Some(found), Some(known)) => found > known,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[async_trait]
impl EventStore for JetStreamEventStore {
    async fn append(
        &self,
        event: DomainEvent,
        condition: Option<AppendCondition>,
    ) -> Result<EventToken, EventStoreError> {
        let _guard = self.append_lock.lock().await;

        let record = EventRecord {
            event,
            stored_at: Utc::now(),
        };
        let payload = Bytes::from(
            serde_json::to_vec(&record)
                .map_err(|e| EventStoreError::FailedToCommitEvent(e.to_string()))?,
        );

        // An unconditional append cannot conflict with anything; it goes
        // straight to the stream with no sequence guard and no log read.
        let Some(condition) = condition else {
            let ack = self
                .context
                .send_publish(self.subject.clone(), Publish::build().payload(payload))
                .await
                .map_err(|e| {
                    EventStoreError::FailedToCommitEvent(format!("Failed to publish: {e}"))
                })?
                .await
                .map_err(|e| {
                    EventStoreError::FailedToCommitEvent(format!("Failed to publish: {e}"))
                })?;
            return Ok(self.committed(ack.sequence, &record));
        };

        for attempt in 0..APPEND_RETRY_LIMIT {
            let log = self.read_log().await?;

            if Self::condition_violated(&log, &condition) {
                return Err(EventStoreError::NewEventsFound);
            }

            let observed_sequence = log.last().map(|e| e.token.position()).unwrap_or(0);
            let publish = Publish::build()
                .payload(payload.clone())
                .expected_last_sequence(observed_sequence);

            let ack = self
                .context
                .send_publish(self.subject.clone(), publish)
                .await
                .map_err(|e| {
                    EventStoreError::FailedToCommitEvent(format!("Failed to publish: {e}"))
                })?
                .await;

            match ack {
                Ok(ack) => {
                    return Ok(self.committed(ack.sequence, &record));
                }
                Err(err) if err.kind() == PublishErrorKind::WrongLastSequence => {
                    // Another process won the sequence race; re-read and
                    // re-check whether its events fall inside our filter.
                    warn!(attempt, "Lost append race, re-reading the log");
                    continue;
                }
                Err(err) => {
                    return Err(EventStoreError::FailedToCommitEvent(format!(
                        "Failed to publish: {err}"
                    )));
                }
            }
        }

        Err(EventStoreError::FailedToCommitEvent(format!(
            "Gave up after {APPEND_RETRY_LIMIT} contended attempts"
        )))
    }

    async fn query(&self, filter: &EventFilter) -> Result<QueriedEvents, EventStoreError> {
        let events: Vec<StoredEvent> = self
            .read_log()
            .await?
            .into_iter()
            .filter(|stored| filter.matches(&stored.event))
            .collect();

        QueriedEvents::from_events(events).ok_or(EventStoreError::NoEventsFound)
    }

    async fn all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.read_log().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ReviewPublicationRequested;
    use crate::identifiers::ReviewId;

    #[test]
    fn test_default_config() {
        let config = JetStreamConfig::default();
        assert_eq!(config.stream_name, "review-log");
        assert_eq!(config.subject_prefix, "reviews");
        assert_eq!(config.max_messages, -1);
    }

    /// Test the wire record round-trips without the token
    #[test]
    fn test_event_record_serde() {
        let record = EventRecord {
            event: ReviewPublicationRequested {
                review_id: ReviewId::new(),
            }
            .into(),
            stored_at: Utc::now(),
        };

        let bytes = serde_json::to_vec(&record).unwrap();
        let back: EventRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.event, record.event);
        assert_eq!(back.stored_at, record.stored_at);
    }
}
