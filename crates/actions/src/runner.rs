// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `ActionRunner` seam between the agent and its external scripts.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised before or while running an action process.
///
/// A script that runs but exits non-zero is NOT an error at this level;
/// its failure travels inside [`ActionOutput::error`] so the pipeline can
/// still publish whatever stdout it received.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no PowerShell interpreter found (tried pwsh, powershell)")]
    InterpreterNotFound,
    #[error("action script not found: {0}")]
    ScriptNotFound(PathBuf),
    #[error("failed to encode action payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to run {action}: {source}")]
    Spawn {
        action: String,
        source: std::io::Error,
    },
    #[error("{0}")]
    Other(String),
}

/// What an action invocation produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutput {
    /// Captured stdout, untouched. May be empty.
    pub stdout: String,
    /// Handler failure, if any. `None` means exit code 0.
    pub error: Option<String>,
}

impl ActionOutput {
    /// Successful invocation with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            error: None,
        }
    }

    /// Failed invocation, optionally with partial stdout.
    pub fn failed(stdout: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            error: Some(error.into()),
        }
    }
}

/// Runs an external action by name with a JSON payload.
#[async_trait]
pub trait ActionRunner: Send + Sync {
    async fn run(&self, action: &str, data: &Value) -> Result<ActionOutput, ActionError>;
}
