// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task work items delivered on the `jobs` exchange.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{AgentId, TaskId};

/// A work item dequeued from the bus.
///
/// Created on dequeue, destroyed after one publish of its result. The
/// `data` mapping is deliberately opaque; action-specific typing belongs
/// to the scripts, not the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub task_id: TaskId,
    /// Target host. Empty means "whoever dequeued it".
    #[serde(default)]
    pub agent_id: AgentId,
    /// Dotted-lowercase action identifier, e.g. `vm.power`.
    #[serde(default)]
    pub action: String,
    /// Optional logical owner of the addressed resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Free-form action parameters, forwarded without inspection.
    #[serde(default)]
    pub data: Value,
    /// Private reply queue name, declared durable on the fly when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Opaque echo value for the control plane's request/response matching.
    #[serde(default)]
    pub correlation_id: String,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default)]
    pub max_attempts: u32,
}

impl Task {
    /// Decode a delivered message body. A failure here is a poison message.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Correlation id echoed on the result envelope: the task's own
    /// `correlationId` when non-empty, else its `taskId`.
    pub fn effective_correlation_id(&self) -> &str {
        if self.correlation_id.is_empty() {
            self.task_id.as_str()
        } else {
            &self.correlation_id
        }
    }

    /// Whether this task addresses the given host. Misrouted tasks (a
    /// non-empty `agentId` naming someone else) are dropped silently.
    pub fn targets(&self, agent_id: &str) -> bool {
        self.agent_id.is_empty() || self.agent_id == agent_id
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
