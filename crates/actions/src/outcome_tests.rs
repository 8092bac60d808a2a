// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn success_envelope_is_unwrapped() {
    let out = ActionOutput::ok(r#"{"ok":true,"result":{"vm":{"state":"Running"}}}"#);
    let outcome = interpret(&out);
    assert!(outcome.ok);
    assert_eq!(outcome.result, json!({"vm": {"state": "Running"}}));
    assert_eq!(outcome.error, "");
}

#[test]
fn other_json_is_used_verbatim() {
    let out = ActionOutput::ok(r#"{"vms":[1,2]}"#);
    let outcome = interpret(&out);
    assert!(outcome.ok);
    assert_eq!(outcome.result, json!({"vms": [1, 2]}));
}

#[test]
fn success_with_non_json_stdout_wraps_raw() {
    let out = ActionOutput::ok("plain text\n");
    let outcome = interpret(&out);
    assert!(outcome.ok);
    assert_eq!(outcome.result, json!({"raw": "plain text\n", "ok": true}));
    assert_eq!(outcome.error, "");
}

#[test]
fn failure_prefers_error_field_from_result_object() {
    let out = ActionOutput::failed(
        r#"{"ok":false,"error":"VM not found"}"#,
        "action script failed (exit 1)",
    );
    let outcome = interpret(&out);
    assert!(!outcome.ok);
    assert_eq!(outcome.error, "VM not found");
    assert_eq!(outcome.result["ok"], false);
}

#[test]
fn failure_falls_back_to_handler_error() {
    let out = ActionOutput::failed(r#"{"ok":false}"#, "action script failed (exit 1)");
    let outcome = interpret(&out);
    assert_eq!(outcome.error, "action script failed (exit 1)");
}

#[test]
fn crash_with_empty_stdout_wraps_empty_raw() {
    let out = ActionOutput::failed("", "Get-VM : not recognized");
    let outcome = interpret(&out);
    assert!(!outcome.ok);
    assert_eq!(outcome.result, json!({"raw": "", "ok": false}));
    assert_eq!(outcome.error, "Get-VM : not recognized");
}

#[test]
fn empty_error_field_does_not_mask_handler_error() {
    let out = ActionOutput::failed(r#"{"error":""}"#, "exit 1");
    let outcome = interpret(&out);
    assert_eq!(outcome.error, "exit 1");
}

#[test]
fn success_envelope_unwraps_result() {
    let inner = unwrap_success_envelope(r#"{"ok":true,"result":{"vms":[1,2]}}"#).unwrap();
    assert_eq!(inner, json!({"vms": [1, 2]}));
}

#[test]
fn non_envelope_json_does_not_unwrap() {
    assert!(unwrap_success_envelope(r#"{"ok":false,"result":{}}"#).is_none());
    assert!(unwrap_success_envelope(r#"{"vms":[]}"#).is_none());
    assert!(unwrap_success_envelope("not json").is_none());
}

#[test]
fn parse_or_string_passes_json_through() {
    assert_eq!(parse_or_string(r#"{"a":1}"#), json!({"a": 1}));
    assert_eq!(
        parse_or_string("free text"),
        Value::String("free text".to_string())
    );
}
