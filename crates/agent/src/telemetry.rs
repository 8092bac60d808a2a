// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The telemetry orchestrator: heartbeat ticker, full-inventory ticker,
//! and the event-driven light refresh fired after each task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hvx_actions::{parse_or_string, unwrap_success_envelope, ActionRunner};
use hvx_broker::{heartbeat_key, inventory_key, PublishOpts, Publisher, EXCHANGE_TELEMETRY};
use hvx_core::{AgentId, Heartbeat, InventoryFull, InventoryMeta, MergeMode, RuntimeContext};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::env;

/// Action behind the periodic authoritative inventory.
pub const ACTION_INVENTORY_FULL: &str = "inventory.refresh";
/// Action behind the per-task light refresh.
pub const ACTION_INVENTORY_LIGHT: &str = "inventory.refresh.light";

/// Publishes heartbeats and inventories.
pub struct Telemetry<P, R> {
    agent_id: AgentId,
    host: String,
    capabilities: Vec<String>,
    context: Arc<RuntimeContext>,
    publisher: Arc<P>,
    runner: Arc<R>,
}

impl<P, R> Telemetry<P, R>
where
    P: Publisher,
    R: ActionRunner,
{
    pub fn new(
        host: String,
        capabilities: Vec<String>,
        context: Arc<RuntimeContext>,
        publisher: Arc<P>,
        runner: Arc<R>,
    ) -> Self {
        Self {
            agent_id: context.agent_id.clone(),
            host,
            capabilities,
            context,
            publisher,
            runner,
        }
    }

    /// Heartbeat ticker; runs until shutdown.
    pub async fn run_heartbeat(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => self.publish_heartbeat().await,
            }
        }
    }

    /// Full-inventory ticker; runs until shutdown.
    pub async fn run_inventory(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => self.publish_full_inventory().await,
            }
        }
    }

    async fn publish_heartbeat(&self) {
        let heartbeat = Heartbeat {
            version: env::AGENT_VERSION.to_string(),
            agent_id: self.agent_id.clone(),
            host: self.host.clone(),
            ts: Utc::now(),
            capabilities: self.capabilities.clone(),
        };
        self.publish_telemetry(
            &heartbeat_key(self.agent_id.as_str()),
            &heartbeat,
            PublishOpts::default(),
            "heartbeat",
        )
        .await;
    }

    /// Invoke `inventory.refresh` and publish what it reports. A success
    /// envelope is unwrapped; anything else goes out unchanged.
    pub async fn publish_full_inventory(&self) {
        let payload = self.context.inventory_payload();
        let output = match self.runner.run(ACTION_INVENTORY_FULL, &payload).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "full inventory action failed");
                return;
            }
        };

        let inventory = unwrap_success_envelope(&output.stdout)
            .unwrap_or_else(|| parse_or_string(&output.stdout));
        let envelope = InventoryFull {
            agent_id: self.agent_id.clone(),
            ts: Utc::now(),
            inventory,
        };
        self.publish_telemetry(
            &inventory_key(self.agent_id.as_str()),
            &envelope,
            PublishOpts::default(),
            "inventory",
        )
        .await;
    }

    /// The post-task hook: invoke `inventory.refresh.light` and publish
    /// a meta envelope. A non-empty success result merges
    /// non-destructively; anything else ships the raw stdout.
    pub async fn light_refresh(&self) {
        let mut payload = self.context.inventory_payload();
        if let Value::Object(map) = &mut payload {
            map.insert("__ctx".to_string(), self.context.ctx_value());
        }

        let output = match self.runner.run(ACTION_INVENTORY_LIGHT, &payload).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "light refresh action failed");
                return;
            }
        };

        let refreshed = if output.error.is_none() {
            unwrap_success_envelope(&output.stdout).filter(|r| !is_empty_result(r))
        } else {
            None
        };
        let (merge_mode, inventory) = match refreshed {
            Some(result) => (MergeMode::PatchNondestructive, result),
            None => (MergeMode::Raw, Value::String(output.stdout)),
        };

        let envelope = InventoryMeta {
            agent_id: self.agent_id.clone(),
            ts: Utc::now(),
            source: ACTION_INVENTORY_LIGHT.to_string(),
            merge_mode,
            inventory,
        };
        let opts = PublishOpts::default()
            .with_header("x-source", ACTION_INVENTORY_LIGHT)
            .with_header("x-merge-mode", merge_mode.as_str())
            .with_header("x-agent-id", self.agent_id.as_str());
        self.publish_telemetry(
            &inventory_key(self.agent_id.as_str()),
            &envelope,
            opts,
            "light refresh",
        )
        .await;
    }

    async fn publish_telemetry<T: serde::Serialize>(
        &self,
        routing_key: &str,
        envelope: &T,
        opts: PublishOpts,
        what: &str,
    ) {
        let body = match serde_json::to_vec(envelope) {
            Ok(body) => body,
            Err(e) => {
                error!(what, error = %e, "telemetry encode failed");
                return;
            }
        };
        if let Err(e) = self
            .publisher
            .publish(EXCHANGE_TELEMETRY, routing_key, body, opts)
            .await
        {
            warn!(what, routing_key, error = %e, "telemetry publish failed");
        } else {
            debug!(what, routing_key, "telemetry published");
        }
    }
}

/// A light-refresh result that carries nothing worth merging.
fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
