//! Binary flag specs
//!
//! Verify help, version, and argument validation before any lock or
//! broker work happens.

use crate::prelude::*;

#[test]
fn help_shows_usage() {
    agentd().args(&["--help"]).passes().stdout_has("USAGE:");
}

#[test]
fn help_mentions_dry_run() {
    agentd().args(&["--help"]).passes().stdout_has("--dry-run");
}

#[test]
fn version_shows_package_version() {
    agentd()
        .args(&["--version"])
        .passes()
        .stdout_has("hvx-agentd 0.1");
}

#[test]
fn unknown_argument_fails_with_usage() {
    agentd()
        .args(&["--bogus"])
        .fails()
        .stderr_has("unexpected argument")
        .stderr_has("Usage:");
}
