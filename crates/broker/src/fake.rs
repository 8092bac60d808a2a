// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake publisher for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::session::{BrokerError, PublishOpts, Publisher};

/// One recorded publish, to an exchange or (with `exchange == ""`) a queue.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub body: Vec<u8>,
    pub opts: PublishOpts,
}

impl PublishedMessage {
    /// Decode the body for assertions.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

/// Fake publisher that records messages and can be made to fail.
#[derive(Clone, Default)]
pub struct FakePublisher {
    inner: Arc<Mutex<FakePublisherState>>,
}

#[derive(Default)]
struct FakePublisherState {
    published: Vec<PublishedMessage>,
    declared_queues: Vec<String>,
    fail_with: Option<String>,
}

impl FakePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail.
    pub fn fail(&self, error: &str) {
        self.inner.lock().fail_with = Some(error.to_string());
    }

    /// Everything published so far, in order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.inner.lock().published.clone()
    }

    /// Messages published to one exchange, in order.
    pub fn published_to(&self, exchange: &str) -> Vec<PublishedMessage> {
        self.inner
            .lock()
            .published
            .iter()
            .filter(|m| m.exchange == exchange)
            .cloned()
            .collect()
    }

    /// Queues declared via the reply path.
    pub fn declared_queues(&self) -> Vec<String> {
        self.inner.lock().declared_queues.clone()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: Vec<u8>,
        opts: PublishOpts,
    ) -> Result<(), BrokerError> {
        let mut state = self.inner.lock();
        if let Some(error) = &state.fail_with {
            return Err(BrokerError::Unavailable(error.clone()));
        }
        state.published.push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            body,
            opts,
        });
        Ok(())
    }

    async fn publish_to_queue(
        &self,
        queue: &str,
        body: Vec<u8>,
        opts: PublishOpts,
    ) -> Result<(), BrokerError> {
        {
            let mut state = self.inner.lock();
            if let Some(error) = &state.fail_with {
                return Err(BrokerError::Unavailable(error.clone()));
            }
            state.declared_queues.push(queue.to_string());
        }
        self.publish("", queue, body, opts).await
    }
}
