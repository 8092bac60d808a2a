// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hvx-agent: the host-resident virtualization agent.
//!
//! Mediates between the control plane and the local hypervisor: consumes
//! job messages, dispatches them to external action scripts, and
//! publishes telemetry and task results back over the bus.

pub mod env;
pub mod lifecycle;
pub mod pipeline;
pub mod telemetry;

pub use lifecycle::{startup, Config, LifecycleError, Startup};
pub use pipeline::TaskPipeline;
pub use telemetry::Telemetry;
