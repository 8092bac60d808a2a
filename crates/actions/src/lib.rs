// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! hvx-actions: out-of-process action execution.
//!
//! Actions are hypervisor-facing PowerShell scripts invoked as black-box
//! processes with a stdin-JSON / stdout-JSON contract. This crate owns
//! interpreter discovery, script resolution, the dual-channel payload
//! hand-off, and the interpretation of whatever the script printed.

pub mod invoker;
pub mod outcome;
pub mod runner;

pub use invoker::{sanitize_action, PwshInvoker};
pub use outcome::{interpret, parse_or_string, unwrap_success_envelope, Outcome};
pub use runner::{ActionError, ActionOutput, ActionRunner};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRunner, RunnerCall};
