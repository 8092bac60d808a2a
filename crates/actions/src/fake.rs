// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake action runner for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::runner::{ActionError, ActionOutput, ActionRunner};

/// Recorded call to [`FakeRunner`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerCall {
    pub action: String,
    pub data: Value,
}

/// Fake runner that replays scripted outputs and records every call.
#[derive(Clone, Default)]
pub struct FakeRunner {
    inner: Arc<Mutex<FakeRunnerState>>,
}

#[derive(Default)]
struct FakeRunnerState {
    responses: HashMap<String, ActionOutput>,
    failures: HashMap<String, String>,
    calls: Vec<RunnerCall>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output returned for `action`.
    pub fn respond(&self, action: &str, output: ActionOutput) {
        self.inner
            .lock()
            .responses
            .insert(action.to_string(), output);
    }

    /// Make `action` fail at the runner level (before any process runs).
    pub fn fail(&self, action: &str, error: &str) {
        self.inner
            .lock()
            .failures
            .insert(action.to_string(), error.to_string());
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RunnerCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl ActionRunner for FakeRunner {
    async fn run(&self, action: &str, data: &Value) -> Result<ActionOutput, ActionError> {
        let mut state = self.inner.lock();
        state.calls.push(RunnerCall {
            action: action.to_string(),
            data: data.clone(),
        });
        if let Some(error) = state.failures.get(action) {
            return Err(ActionError::Other(error.clone()));
        }
        Ok(state
            .responses
            .get(action)
            .cloned()
            .unwrap_or_else(|| ActionOutput::ok("{\"ok\":true,\"result\":{}}")))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
