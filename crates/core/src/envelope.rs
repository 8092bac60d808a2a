// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelopes the agent publishes back to the control plane.
//!
//! All of these serialize as camelCase JSON with UTC RFC3339 timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{AgentId, TaskId};

/// Result envelope, published exactly once per completed task delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub ok: bool,
    /// Parsed action output, or `{raw: <stdout>, ok: <ok>}` for non-JSON.
    pub result: Value,
    /// Empty on success.
    pub error: String,
    pub finished_at: DateTime<Utc>,
}

impl TaskResult {
    /// Stamp a result envelope with the current time.
    pub fn new(task_id: TaskId, agent_id: AgentId, ok: bool, result: Value, error: String) -> Self {
        Self {
            task_id,
            agent_id,
            ok,
            result,
            error,
            finished_at: Utc::now(),
        }
    }
}

/// Periodic liveness beacon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    /// Agent build version.
    pub version: String,
    pub agent_id: AgentId,
    /// Hostname, resolved once at startup.
    pub host: String,
    pub ts: DateTime<Utc>,
    /// Action identifiers this host advertises.
    pub capabilities: Vec<String>,
}

/// Periodic authoritative inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryFull {
    pub agent_id: AgentId,
    pub ts: DateTime<Utc>,
    pub inventory: Value,
}

/// Event-driven inventory refresh carrying merge instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMeta {
    pub agent_id: AgentId,
    pub ts: DateTime<Utc>,
    /// Where this refresh came from, e.g. `inventory.refresh.light`.
    pub source: String,
    pub merge_mode: MergeMode,
    pub inventory: Value,
}

/// How the control plane should fold a partial inventory into its view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    PatchNondestructive,
    Replace,
    Raw,
}

impl MergeMode {
    /// Wire token, also used for the `x-merge-mode` message header.
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::PatchNondestructive => "patch-nondestructive",
            MergeMode::Replace => "replace",
            MergeMode::Raw => "raw",
        }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
