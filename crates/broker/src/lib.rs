// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! hvx-broker: the resilient message-bus session.
//!
//! One logical AMQP session per process: a single connection/channel pair
//! that survives transport failures. Exchange declarations are idempotent
//! and repeated on every (re)connection; a peer that declared different
//! parameters is a fatal misconfiguration.

pub mod consume;
pub mod session;
pub mod topology;

pub use consume::{run_consumer, ConsumerConfig, DeliveryHandler, Disposition, PREFETCH};
pub use session::{BrokerError, BrokerSession, PublishOpts, Publisher};
pub use topology::{
    consumer_tag, heartbeat_key, inventory_key, result_key, task_queue, EXCHANGE_JOBS,
    EXCHANGE_RESULTS, EXCHANGE_TELEMETRY,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePublisher, PublishedMessage};
