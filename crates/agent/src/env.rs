// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

/// Agent build version (from Cargo.toml plus the git hash baked at build).
pub const AGENT_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

/// Resolve state directory: HVX_STATE_DIR > XDG_STATE_HOME/openhvx > ~/.local/state/openhvx
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("HVX_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("openhvx"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/openhvx"))
}

/// Explicit config file location override.
pub fn config_path() -> Option<PathBuf> {
    std::env::var("HVX_CONFIG").ok().map(PathBuf::from)
}

/// Agent identifier override.
pub fn agent_id() -> Option<String> {
    std::env::var("HVX_AGENT_ID").ok().filter(|s| !s.is_empty())
}

/// Broker URL override.
pub fn broker_url() -> Option<String> {
    std::env::var("HVX_BROKER_URL")
        .ok()
        .filter(|s| !s.is_empty())
}

/// Managed tree base path override.
pub fn base_path() -> Option<PathBuf> {
    std::env::var("HVX_BASE_PATH")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Heartbeat interval override, in seconds.
pub fn heartbeat_secs() -> Option<i64> {
    std::env::var("HVX_HEARTBEAT_SECS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
}

/// Full-inventory interval override, in seconds.
pub fn inventory_secs() -> Option<i64> {
    std::env::var("HVX_INVENTORY_SECS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
}

/// Capability set override, comma-separated.
pub fn capabilities() -> Option<Vec<String>> {
    std::env::var("HVX_CAPABILITIES").ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/// Action script root override.
pub fn actions_root() -> Option<PathBuf> {
    std::env::var("HVX_ACTIONS_ROOT")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
