// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collision-free name allocation.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::path::DatastoreError;

/// Highest ` (n)` suffix probed before falling back to a timestamp.
const MAX_PROBES: u32 = 9999;

/// Return `dir/name.ext` if free, else probe `dir/name (1).ext`,
/// `dir/name (2).ext`, … up to 9999, then fall back to
/// `dir/name-<yyyyMMdd-HHmmss.fff>.ext`. Fails only when even the
/// timestamped name is taken.
///
/// Deterministic given the observed filesystem state; the exclusive
/// create performed by the caller is what actually prevents overwrite.
pub fn unique_path(desired: &Path) -> Result<PathBuf, DatastoreError> {
    if !desired.exists() {
        return Ok(desired.to_path_buf());
    }

    let dir = desired.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = desired
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = desired
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for n in 1..=MAX_PROBES {
        let candidate = dir.join(format!("{stem} ({n}){ext}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    let stamp = Utc::now().format("%Y%m%d-%H%M%S%.3f");
    let fallback = dir.join(format!("{stem}-{stamp}{ext}"));
    if !fallback.exists() {
        return Ok(fallback);
    }
    Err(DatastoreError::NameExhausted(desired.to_path_buf()))
}

#[cfg(test)]
#[path = "unique_tests.rs"]
mod tests;
