//! NATS connection layer for the durable event log
//!
//! The JetStream store only needs a connected client; everything about
//! streams and consumers lives in
//! [`jetstream_event_store`](super::jetstream_event_store). This module
//! owns connecting: options, credentials, reconnect pacing.

use async_nats::jetstream::{self, Context as JetStreamContext};
use async_nats::{Client, ConnectOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur when working with NATS
#[derive(Debug, Error)]
pub enum NatsError {
    /// The configuration cannot describe a usable connection
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to establish a connection to the NATS server
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Error occurred in JetStream operations
    #[error("JetStream error: {0}")]
    JetStreamError(String),
}

/// Username/password credentials for the event log connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsAuth {
    /// Username
    pub user: String,
    /// Password
    pub password: String,
}

/// Connection settings for the event log's NATS server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// Server URL, e.g. "nats://localhost:4222"
    pub url: String,

    /// Credentials; `None` connects anonymously
    pub auth: Option<NatsAuth>,

    /// Whether the connection must use TLS
    pub tls_required: bool,

    /// How long to wait for the initial connection, in seconds
    pub connection_timeout_secs: u64,

    /// Pause between reconnect attempts, in seconds
    pub reconnect_interval_secs: u64,

    /// Reconnect attempts before giving up (0 = keep trying)
    pub max_reconnects: usize,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            auth: None,
            tls_required: false,
            connection_timeout_secs: 10,
            reconnect_interval_secs: 5,
            max_reconnects: 0,
        }
    }
}

/// A connected NATS client with its JetStream context
#[derive(Debug)]
pub struct NatsClient {
    client: Client,
    jetstream: JetStreamContext,
    config: NatsConfig,
}

impl NatsClient {
    /// Connect to the configured server
    pub async fn connect(config: NatsConfig) -> Result<Self, NatsError> {
        if config.url.is_empty() {
            return Err(NatsError::ConfigurationError(
                "server URL is empty".to_string(),
            ));
        }

        let mut options = ConnectOptions::new()
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .reconnect_delay_callback({
                let interval = config.reconnect_interval_secs;
                let max_reconnects = config.max_reconnects;
                move |attempts| {
                    if max_reconnects > 0 && attempts >= max_reconnects {
                        // Stop reconnecting after max attempts
                        Duration::from_secs(0)
                    } else {
                        Duration::from_secs(interval)
                    }
                }
            })
            .event_callback(|event| async move {
                match event {
                    async_nats::Event::Disconnected => warn!("NATS disconnected"),
                    async_nats::Event::Connected => info!("NATS connected"),
                    async_nats::Event::ClientError(err) => warn!(%err, "NATS client error"),
                    _ => {}
                }
            });

        if let Some(auth) = &config.auth {
            options = options.user_and_password(auth.user.clone(), auth.password.clone());
        }
        if config.tls_required {
            options = options.require_tls(true);
        }

        let client = options.connect(&config.url).await.map_err(|e| {
            NatsError::ConnectionFailed(format!("Failed to connect to {}: {}", config.url, e))
        })?;
        let jetstream = jetstream::new(client.clone());

        Ok(Self {
            client,
            jetstream,
            config,
        })
    }

    /// The underlying NATS client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The JetStream context over this connection
    pub fn jetstream(&self) -> &JetStreamContext {
        &self.jetstream
    }

    /// The configuration this client connected with
    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Whether the server is currently reachable
    pub async fn is_connected(&self) -> bool {
        self.client.flush().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NatsConfig::default();
        assert_eq!(config.url, "nats://localhost:4222");
        assert!(config.auth.is_none());
        assert_eq!(config.connection_timeout_secs, 10);
        assert_eq!(config.max_reconnects, 0);
    }

    /// Test partial JSON fills the remaining fields from the defaults
    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: NatsConfig =
            serde_json::from_str(r#"{ "url": "nats://event-log:4222" }"#).unwrap();
        assert_eq!(config.url, "nats://event-log:4222");
        assert_eq!(config.reconnect_interval_secs, 5);
        assert!(!config.tls_required);
    }

    #[test]
    fn test_config_with_auth_round_trips() {
        let config = NatsConfig {
            auth: Some(NatsAuth {
                user: "reviewer".to_string(),
                password: "hunter2".to_string(),
            }),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: NatsConfig = serde_json::from_str(&json).unwrap();
        let auth = back.auth.unwrap();
        assert_eq!(auth.user, "reviewer");
    }

    #[tokio::test]
    async fn test_empty_url_is_a_configuration_error() {
        let config = NatsConfig {
            url: String::new(),
            ..Default::default()
        };
        let err = NatsClient::connect(config).await.unwrap_err();
        assert!(matches!(err, NatsError::ConfigurationError(_)));
    }
}
