// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Move-to-trash in place of deletion.
//!
//! Nothing in the managed tree is ever unlinked; retired files and
//! directories are relocated under `_trash/<UTC stamp>/<path relative
//! to the root>` instead.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::dirs::DataDirs;
use crate::path::{assert_safe_target, DatastoreError};
use crate::unique::unique_path;

/// Relocate `target` (file or directory) into the trash. Returns the new
/// location. Collisions inside the trash resolve to unique names.
pub fn move_to_trash(dirs: &DataDirs, target: &Path) -> Result<PathBuf, DatastoreError> {
    let target = assert_safe_target(target, dirs)?;
    let rel = target
        .strip_prefix(&dirs.root)
        .map_err(|_| DatastoreError::OutsideRoot(target.clone()))?;

    let stamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let dest = dirs.trash.join(stamp).join(rel);
    let dest_dir = dest
        .parent()
        .ok_or_else(|| DatastoreError::OutsideRoot(dest.clone()))?;
    fs::create_dir_all(dest_dir)?;

    let dest = unique_path(&dest)?;
    fs::rename(&target, &dest)?;
    Ok(dest)
}

#[cfg(test)]
#[path = "trash_tests.rs"]
mod tests;
