// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn queue_and_tag_naming() {
    assert_eq!(task_queue("HOST-A"), "agent.HOST-A.tasks");
    assert_eq!(consumer_tag("HOST-A"), "agent-HOST-A");
}

#[parameterized(
    heartbeat = { heartbeat_key("HOST-A"), "heartbeat.HOST-A" },
    inventory = { inventory_key("HOST-A"), "inventory.HOST-A" },
    result = { result_key("T1"), "task.T1" },
)]
fn routing_keys(actual: String, expected: &str) {
    assert_eq!(actual, expected);
}

#[test]
fn exchange_names_are_stable() {
    // These are wire contracts shared with the control plane.
    assert_eq!(EXCHANGE_JOBS, "jobs");
    assert_eq!(EXCHANGE_TELEMETRY, "agent.telemetry");
    assert_eq!(EXCHANGE_RESULTS, "results");
}
