// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide runtime context exposed to action scripts.
//!
//! Built once at boot after the managed tree is ensured; read-only
//! thereafter. Scripts receive it under the `__ctx` key so they can
//! resolve placement without embedding policy.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::id::AgentId;

/// What a datastore is for. Determines placement policy on the script side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreKind {
    Root,
    Vm,
    Vhd,
    Image,
    Iso,
    Checkpoint,
    Logs,
}

/// One managed datastore, as advertised to action scripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatastoreDescriptor {
    pub name: String,
    pub kind: DatastoreKind,
    pub path: PathBuf,
    pub read_only: bool,
}

/// Process-wide agent identity and managed paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeContext {
    pub agent_id: AgentId,
    pub base_path: PathBuf,
    /// Named paths of the managed tree, keyed by datastore name.
    pub paths: BTreeMap<String, PathBuf>,
    pub datastores: Vec<DatastoreDescriptor>,
}

impl RuntimeContext {
    /// The `__ctx` object merged into every action payload.
    pub fn ctx_value(&self) -> Value {
        json!({
            "agentId": self.agent_id,
            "basePath": self.base_path,
            "datastores": self.datastores,
        })
    }

    /// Payload for the inventory refresh actions: `{basePath, datastores}`.
    pub fn inventory_payload(&self) -> Value {
        json!({
            "basePath": self.base_path,
            "datastores": self.datastores,
        })
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
