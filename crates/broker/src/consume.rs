// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervised consume loop.
//!
//! The loop is infinite during steady state: when the channel dies it
//! re-ensures the session with unbounded retries, redeclares the queue
//! and binding, reapplies prefetch, and reads deliveries until the
//! stream closes again. Transient disconnects are invisible to callers.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Consumer};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::session::BrokerSession;
use crate::topology;

/// Unacknowledged deliveries allowed in flight.
pub const PREFETCH: u16 = 5;

/// Back-off between supervision cycles after a channel death.
pub const RESUME_BACKOFF: Duration = Duration::from_secs(3);

/// What to do with a processed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledge: handled (or deliberately ignored).
    Ack,
    /// Negative-acknowledge without requeue: poison or failed.
    Drop,
}

/// Receives each delivered message body.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn on_delivery(&self, body: &[u8]) -> Disposition;
}

/// Queue/binding/tag parameters for one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    pub queue: String,
    pub binding_key: String,
    pub consumer_tag: String,
    pub prefetch: u16,
}

impl ConsumerConfig {
    /// The task consumer for this host: queue `agent.<id>.tasks` bound to
    /// `jobs` with the agent id as routing key.
    pub fn for_agent(agent_id: &str) -> Self {
        Self {
            queue: topology::task_queue(agent_id),
            binding_key: agent_id.to_string(),
            consumer_tag: topology::consumer_tag(agent_id),
            prefetch: PREFETCH,
        }
    }
}

/// Run the consume loop until `shutdown` fires.
pub async fn run_consumer<H: DeliveryHandler>(
    session: &BrokerSession,
    cfg: &ConsumerConfig,
    handler: &H,
    shutdown: &CancellationToken,
) {
    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let channel = match session.channel().await {
            Ok(channel) => channel,
            Err(e) => {
                warn!(error = %e, "consume: session unavailable, retrying");
                if wait_or_cancel(shutdown, RESUME_BACKOFF).await {
                    return;
                }
                continue;
            }
        };

        let mut consumer = match attach(&channel, cfg).await {
            Ok(consumer) => consumer,
            Err(e) => {
                warn!(error = %e, queue = %cfg.queue, "consume: attach failed");
                session.reset().await;
                if wait_or_cancel(shutdown, RESUME_BACKOFF).await {
                    return;
                }
                continue;
            }
        };

        info!(queue = %cfg.queue, tag = %cfg.consumer_tag, "consuming tasks");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                next = consumer.next() => match next {
                    Some(Ok(delivery)) => {
                        let settle = match handler.on_delivery(&delivery.data).await {
                            Disposition::Ack => delivery.ack(BasicAckOptions::default()).await,
                            Disposition::Drop => {
                                delivery
                                    .nack(BasicNackOptions {
                                        requeue: false,
                                        ..Default::default()
                                    })
                                    .await
                            }
                        };
                        if let Err(e) = settle {
                            warn!(error = %e, "delivery settle failed");
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "delivery stream error");
                        break;
                    }
                    None => {
                        info!("delivery channel closed");
                        break;
                    }
                },
            }
        }

        session.reset().await;
        if wait_or_cancel(shutdown, RESUME_BACKOFF).await {
            return;
        }
    }
}

async fn attach(channel: &Channel, cfg: &ConsumerConfig) -> Result<Consumer, lapin::Error> {
    channel
        .queue_declare(
            &cfg.queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_bind(
            &cfg.queue,
            topology::EXCHANGE_JOBS,
            &cfg.binding_key,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;
    channel
        .basic_qos(cfg.prefetch, BasicQosOptions::default())
        .await?;
    channel
        .basic_consume(
            &cfg.queue,
            &cfg.consumer_tag,
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
}

/// Sleep for `duration`, returning true when shutdown fired instead.
async fn wait_or_cancel(shutdown: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

#[cfg(test)]
#[path = "consume_tests.rs"]
mod tests;
