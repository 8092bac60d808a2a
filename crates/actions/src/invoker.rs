// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PowerShell action invocation.
//!
//! The payload is presented through two channels simultaneously: as the
//! inline `-Payload <json>` argument and as `{action, data}` on stdin.
//! Both are contractual — different scripts read from different sources.
//! Scripts that declare no `Payload` parameter make the interpreter fail
//! with a recognizable message; the invocation is retried once without
//! the inline argument so the script can read stdin instead.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::runner::{ActionError, ActionOutput, ActionRunner};

/// Name of the inline payload parameter scripts may declare.
const INLINE_ARG: &str = "-Payload";

/// Interpreter candidates in preference order.
const INTERPRETERS: &[&str] = &["pwsh", "powershell"];

/// Flags passed to every interpreter invocation.
const INTERPRETER_FLAGS: &[&str] = &["-NoProfile", "-NonInteractive", "-File"];

/// Invokes `actions/<name>.ps1` scripts under a configured root.
#[derive(Debug, Clone)]
pub struct PwshInvoker {
    interpreter: PathBuf,
    script_root: PathBuf,
}

impl PwshInvoker {
    /// Locate the interpreter and the script root.
    ///
    /// The script root defaults to `actions/` next to the executable,
    /// falling back to `actions/` under the current working directory.
    pub fn discover(script_root: Option<PathBuf>) -> Result<Self, ActionError> {
        let interpreter = resolve_interpreter().ok_or(ActionError::InterpreterNotFound)?;
        let script_root = match script_root {
            Some(root) => root,
            None => default_script_root(),
        };
        debug!(
            interpreter = %interpreter.display(),
            script_root = %script_root.display(),
            "action invoker ready"
        );
        Ok(Self {
            interpreter,
            script_root,
        })
    }

    /// Build an invoker from explicit parts (used by tests).
    pub fn with_parts(interpreter: PathBuf, script_root: PathBuf) -> Self {
        Self {
            interpreter,
            script_root,
        }
    }

    /// Resolve the script path for an action identifier.
    pub fn script_path(&self, action: &str) -> Result<PathBuf, ActionError> {
        let script = self.script_root.join(format!("{}.ps1", sanitize_action(action)));
        if !script.is_file() {
            return Err(ActionError::ScriptNotFound(script));
        }
        Ok(script)
    }

    async fn exec(
        &self,
        action: &str,
        script: &Path,
        inline: Option<&str>,
        envelope: &[u8],
    ) -> Result<std::process::Output, ActionError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.args(INTERPRETER_FLAGS)
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(payload) = inline {
            cmd.arg(INLINE_ARG).arg(payload);
        }

        let mut child = cmd.spawn().map_err(|source| ActionError::Spawn {
            action: action.to_string(),
            source,
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A script that never reads stdin may close it early; that
            // must not fail the invocation.
            if let Err(e) = stdin.write_all(envelope).await {
                debug!(action, error = %e, "stdin payload not consumed");
            }
        }

        child
            .wait_with_output()
            .await
            .map_err(|source| ActionError::Spawn {
                action: action.to_string(),
                source,
            })
    }
}

#[async_trait]
impl ActionRunner for PwshInvoker {
    async fn run(&self, action: &str, data: &Value) -> Result<ActionOutput, ActionError> {
        let script = self.script_path(action)?;
        let inline = serde_json::to_string(data)?;
        let envelope = serde_json::to_vec(&json!({ "action": action, "data": data }))?;

        let mut output = self.exec(action, &script, Some(&inline), &envelope).await?;

        let retry_via_stdin = !output.status.success()
            && missing_inline_parameter(&String::from_utf8_lossy(&output.stderr));
        if retry_via_stdin {
            // Script takes its payload from stdin only; run it again
            // without the inline argument.
            debug!(action, "script declares no inline parameter, retrying via stdin");
            output = self.exec(action, &script, None, &envelope).await?;
        }

        let result = map_output(&output);
        if let Some(error) = &result.error {
            warn!(action, error = %error, "action script failed");
        }
        Ok(result)
    }
}

/// Lower-case `action` and replace anything outside `[a-z0-9._-]` with `-`.
pub fn sanitize_action(action: &str) -> String {
    action
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Search `PATH` for `pwsh`, then `powershell`.
pub fn resolve_interpreter() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for name in INTERPRETERS {
        for dir in std::env::split_paths(&path_var) {
            for candidate in [dir.join(name), dir.join(format!("{name}.exe"))] {
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// `actions/` next to the executable when present, else under the cwd.
pub fn default_script_root() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let beside_exe = dir.join("actions");
            if beside_exe.is_dir() {
                return beside_exe;
            }
        }
    }
    std::env::current_dir()
        .map(|cwd| cwd.join("actions"))
        .unwrap_or_else(|_| PathBuf::from("actions"))
}

/// PowerShell's complaint when a script declares no `Payload` parameter.
fn missing_inline_parameter(stderr: &str) -> bool {
    stderr
        .to_lowercase()
        .contains("parameter cannot be found that matches parameter name 'payload'")
}

/// Map process output to an [`ActionOutput`] per the invocation contract.
fn map_output(output: &std::process::Output) -> ActionOutput {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return ActionOutput::ok(stdout);
    }

    let code = output.status.code().unwrap_or(-1);
    if !stdout.trim().is_empty() {
        // The script still produced a result; surface both.
        return ActionOutput::failed(stdout, format!("action script failed (exit {code})"));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    let error = if trimmed.is_empty() {
        format!("action script failed (exit {code})")
    } else {
        trimmed.to_string()
    };
    ActionOutput::failed(String::new(), error)
}

#[cfg(test)]
#[path = "invoker_tests.rs"]
mod tests;
