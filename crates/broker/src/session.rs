// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared broker session.
//!
//! At most one connection and one channel are live; every publish and
//! consume operation traverses this pair. Reconnection transitions are
//! serialized under the session mutex, which is async because the
//! critical section dials and declares.

use std::time::Duration;

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::topology;

/// Bounded retries while establishing the first connection.
pub const INIT_ATTEMPTS: u32 = 3;
/// Back-off between initial connection attempts.
pub const INIT_BACKOFF: Duration = Duration::from_secs(2);
/// Bounded retries for a publish hitting a connection-class failure.
pub const PUBLISH_ATTEMPTS: u32 = 3;
/// Back-off between publish retries.
pub const PUBLISH_BACKOFF: Duration = Duration::from_secs(2);

/// AMQP delivery-mode for persistent messages.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// Errors from the broker session.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker URL is empty")]
    EmptyUrl,
    #[error("connect to {url} failed after {attempts} attempts: {source}")]
    Connect {
        url: String,
        attempts: u32,
        source: lapin::Error,
    },
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),
    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Per-publish options: correlation id echo and message headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishOpts {
    pub correlation_id: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl PublishOpts {
    /// Options carrying only a correlation id.
    pub fn correlated(id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Append a message header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Seam for everything that publishes to the bus.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish to a named exchange.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: Vec<u8>,
        opts: PublishOpts,
    ) -> Result<(), BrokerError>;

    /// Declare `queue` durable and publish to it via the default exchange
    /// (the private-reply convention).
    async fn publish_to_queue(
        &self,
        queue: &str,
        body: Vec<u8>,
        opts: PublishOpts,
    ) -> Result<(), BrokerError>;
}

#[derive(Debug)]
struct Live {
    connection: Connection,
    channel: Channel,
}

/// Single logical session to the message bus.
#[derive(Debug)]
pub struct BrokerSession {
    url: String,
    inner: Mutex<Option<Live>>,
}

impl BrokerSession {
    /// Store the URL and attempt the first connect with bounded retries.
    ///
    /// Dial and declare failures are retried [`INIT_ATTEMPTS`] times and
    /// then surfaced; the process aborts on a session that never came up.
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        if url.is_empty() {
            return Err(BrokerError::EmptyUrl);
        }
        let session = Self {
            url: url.to_string(),
            inner: Mutex::new(None),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match session.channel().await {
                Ok(_) => return Ok(session),
                Err(BrokerError::Amqp(e)) if attempt < INIT_ATTEMPTS => {
                    warn!(attempt, error = %e, "broker connect failed, retrying");
                    tokio::time::sleep(INIT_BACKOFF).await;
                }
                Err(BrokerError::Amqp(e)) => {
                    return Err(BrokerError::Connect {
                        url: session.url.clone(),
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// The open channel, dialing lazily when the session is down.
    pub async fn channel(&self) -> Result<Channel, BrokerError> {
        let mut guard = self.inner.lock().await;
        if let Some(live) = guard.as_ref() {
            if live.connection.status().connected() && live.channel.status().connected() {
                return Ok(live.channel.clone());
            }
            debug!("broker session is stale, redialing");
        }

        let live = Self::dial(&self.url).await?;
        let channel = live.channel.clone();
        *guard = Some(live);
        Ok(channel)
    }

    async fn dial(url: &str) -> Result<Live, BrokerError> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        // Publish confirms make unroutable mandatory returns observable.
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        topology::declare_exchanges(&channel).await?;
        info!("broker session established");
        Ok(Live {
            connection,
            channel,
        })
    }

    /// Drop the live pair so the next operation redials.
    pub async fn reset(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(live) = guard.take() {
            let _ = live.connection.close(200, "resetting session").await;
        }
    }

    /// Best-effort shutdown.
    pub async fn close(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(live) = guard.take() {
            if let Err(e) = live.connection.close(200, "agent shutting down").await {
                debug!(error = %e, "broker close failed");
            }
        }
    }

    async fn publish_once(
        channel: &Channel,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        opts: &PublishOpts,
    ) -> Result<(), lapin::Error> {
        let mut properties = BasicProperties::default()
            .with_content_type("application/json".to_string().into())
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT);
        if let Some(correlation_id) = &opts.correlation_id {
            properties = properties.with_correlation_id(correlation_id.clone().into());
        }
        if !opts.headers.is_empty() {
            let mut table = FieldTable::default();
            for (key, value) in &opts.headers {
                table.insert(key.clone().into(), AMQPValue::LongString(value.clone().into()));
            }
            properties = properties.with_headers(table);
        }

        let confirm = channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions {
                    mandatory: true,
                    immediate: false,
                },
                body,
                properties,
            )
            .await?;
        let mut confirmation = confirm.await?;

        // An unroutable mandatory publish comes back as a returned
        // message. The broker accepted it, so this is logged, not retried.
        if confirmation.take_message().is_some() {
            warn!(
                exchange,
                routing_key,
                correlation_id = opts.correlation_id.as_deref().unwrap_or(""),
                "publish returned unroutable"
            );
        }
        Ok(())
    }

    /// Publish with lazy reconnect and bounded retries on connection-class
    /// failures. Other errors are returned verbatim; the caller decides.
    pub async fn publish_raw(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        opts: &PublishOpts,
    ) -> Result<(), BrokerError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let channel = match self.channel().await {
                Ok(channel) => channel,
                Err(e) if attempt < PUBLISH_ATTEMPTS => {
                    warn!(attempt, error = %e, "publish: session unavailable, retrying");
                    tokio::time::sleep(PUBLISH_BACKOFF).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match Self::publish_once(&channel, exchange, routing_key, body, opts).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if channel.status().connected() {
                        // Not a connection failure; surface it verbatim.
                        return Err(e.into());
                    }
                    warn!(attempt, exchange, routing_key, error = %e, "publish lost connection");
                    self.reset().await;
                    if attempt >= PUBLISH_ATTEMPTS {
                        return Err(e.into());
                    }
                    tokio::time::sleep(PUBLISH_BACKOFF).await;
                }
            }
        }
    }

    /// Declare a durable queue on the current channel.
    pub async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let channel = self.channel().await?;
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Publisher for BrokerSession {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: Vec<u8>,
        opts: PublishOpts,
    ) -> Result<(), BrokerError> {
        self.publish_raw(exchange, routing_key, &body, &opts).await
    }

    async fn publish_to_queue(
        &self,
        queue: &str,
        body: Vec<u8>,
        opts: PublishOpts,
    ) -> Result<(), BrokerError> {
        self.declare_queue(queue).await?;
        self.publish_raw("", queue, &body, &opts).await
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
