//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for running hvx-agentd with an isolated state
//! directory and asserting on the outcome.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Environment variables the agent reads; cleared for every spec run so
/// the host environment cannot leak in.
const HVX_VARS: &[&str] = &[
    "HVX_STATE_DIR",
    "HVX_CONFIG",
    "HVX_AGENT_ID",
    "HVX_BROKER_URL",
    "HVX_BASE_PATH",
    "HVX_HEARTBEAT_SECS",
    "HVX_INVENTORY_SECS",
    "HVX_CAPABILITIES",
    "HVX_ACTIONS_ROOT",
];

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale (e.g. compiled by a removed worktree
/// into a shared target directory).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where hvx-agentd is built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Returns the path to the hvx-agentd binary.
pub fn agentd_binary() -> PathBuf {
    binary_path("hvx-agentd")
}

/// Create a spec builder for agent invocations.
pub fn agentd() -> AgentBuilder {
    AgentBuilder::new()
}

pub struct AgentBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
    state_dir: Option<tempfile::TempDir>,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: Vec::new(),
            state_dir: None,
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    /// Run with an isolated, throwaway state directory.
    pub fn isolated(mut self) -> Self {
        self.state_dir = Some(tempfile::tempdir().unwrap());
        self
    }

    pub fn run(self) -> SpecOutput {
        let mut cmd = Command::new(agentd_binary());
        for var in HVX_VARS {
            cmd.env_remove(var);
        }
        if let Some(dir) = &self.state_dir {
            cmd.env("HVX_STATE_DIR", dir.path());
            cmd.env("HVX_AGENT_ID", "SPEC-HOST");
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd.args(&self.args);
        let output = cmd.output().expect("spawn hvx-agentd");
        SpecOutput {
            output,
            state_dir: self.state_dir,
        }
    }

    pub fn passes(self) -> SpecOutput {
        let out = self.run();
        assert!(
            out.output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            out.output.status.code(),
            out.stdout(),
            out.stderr(),
        );
        out
    }

    pub fn fails(self) -> SpecOutput {
        let out = self.run();
        assert!(
            !out.output.status.success(),
            "expected failure\nstdout: {}",
            out.stdout(),
        );
        out
    }
}

pub struct SpecOutput {
    output: Output,
    state_dir: Option<tempfile::TempDir>,
}

impl SpecOutput {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout().contains(needle),
            "stdout missing {needle:?}:\n{}",
            self.stdout(),
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr().contains(needle),
            "stderr missing {needle:?}:\n{}",
            self.stderr(),
        );
        self
    }

    /// The isolated state directory, when one was requested.
    pub fn state_path(&self) -> &Path {
        self.state_dir.as_ref().expect("isolated() not used").path()
    }

    /// Parse stdout as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout()).expect("stdout is not JSON")
    }
}
