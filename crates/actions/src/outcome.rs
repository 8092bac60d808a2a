// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interpretation of action stdout.
//!
//! Scripts answer in one of three shapes: a success envelope
//! `{ok: true, result: <R>}`, arbitrary JSON used verbatim, or non-JSON
//! text wrapped as `{raw: <stdout>, ok: <ok>}`.

use serde_json::{json, Value};

use crate::runner::ActionOutput;

/// The interpreted result of one action invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub ok: bool,
    /// What goes into the result envelope's `result` field.
    pub result: Value,
    /// First non-empty of: the result object's own `error` field, the
    /// handler error, or `""`.
    pub error: String,
}

/// Interpret captured output into the result-envelope fields.
///
/// A success envelope is unwrapped so its inner result travels alone;
/// any other JSON is used verbatim.
pub fn interpret(output: &ActionOutput) -> Outcome {
    let ok = output.error.is_none();

    let result = match serde_json::from_str::<Value>(output.stdout.trim()) {
        Ok(value) => envelope_result(&value).unwrap_or(value),
        Err(_) => json!({ "raw": output.stdout, "ok": ok }),
    };

    let error = result
        .get("error")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| output.error.clone())
        .unwrap_or_default();

    Outcome { ok, result, error }
}

/// Unwrap a success envelope `{ok: true, result: <R>}`, returning `R`.
pub fn unwrap_success_envelope(stdout: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(stdout.trim()).ok()?;
    envelope_result(&value)
}

fn envelope_result(value: &Value) -> Option<Value> {
    if value.get("ok").and_then(Value::as_bool) == Some(true) {
        value.get("result").cloned()
    } else {
        None
    }
}

/// Parse stdout as JSON, else carry it unchanged as a JSON string.
pub fn parse_or_string(stdout: &str) -> Value {
    serde_json::from_str(stdout.trim()).unwrap_or_else(|_| Value::String(stdout.to_string()))
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
