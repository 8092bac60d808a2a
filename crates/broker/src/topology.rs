// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exchange topology and name derivation.
//!
//! Declarations must match across peers: durable, non-auto-delete,
//! non-internal, no arguments. A mismatch is surfaced, never papered
//! over, because it means a peer is misconfigured.

use lapin::options::ExchangeDeclareOptions;
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind};

/// Carries tasks; routing key = target agent id.
pub const EXCHANGE_JOBS: &str = "jobs";
/// Heartbeats and inventories, routed per agent.
pub const EXCHANGE_TELEMETRY: &str = "agent.telemetry";
/// Task result envelopes, routed per task.
pub const EXCHANGE_RESULTS: &str = "results";

/// The task queue this host consumes: `agent.<agentId>.tasks`.
pub fn task_queue(agent_id: &str) -> String {
    format!("agent.{agent_id}.tasks")
}

/// Consumer tag: `agent-<agentId>`.
pub fn consumer_tag(agent_id: &str) -> String {
    format!("agent-{agent_id}")
}

/// Telemetry routing key for heartbeats.
pub fn heartbeat_key(agent_id: &str) -> String {
    format!("heartbeat.{agent_id}")
}

/// Telemetry routing key for inventories (full and light).
pub fn inventory_key(agent_id: &str) -> String {
    format!("inventory.{agent_id}")
}

/// Results routing key: `task.<taskId>`.
pub fn result_key(task_id: &str) -> String {
    format!("task.{task_id}")
}

/// Declare the three exchanges with their stable parameters.
pub async fn declare_exchanges(channel: &Channel) -> Result<(), lapin::Error> {
    for (name, kind) in [
        (EXCHANGE_JOBS, ExchangeKind::Direct),
        (EXCHANGE_TELEMETRY, ExchangeKind::Topic),
        (EXCHANGE_RESULTS, ExchangeKind::Topic),
    ] {
        channel
            .exchange_declare(
                name,
                kind,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    internal: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod tests;
