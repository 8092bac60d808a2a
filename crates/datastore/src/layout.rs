// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured path composition inside the managed tree.
//!
//! These helpers exist so callers never hand-join datastore paths: each
//! one cleans the composed path and verifies it stays under its sub-root.

use std::path::{Path, PathBuf};

use crate::dirs::DataDirs;
use crate::path::{clean_abs, is_under, DatastoreError};

fn join_under(base: &Path, segments: &[&str]) -> Result<PathBuf, DatastoreError> {
    let mut path = base.to_path_buf();
    for segment in segments {
        path.push(segment);
    }
    let cleaned = clean_abs(&path)?;
    if !is_under(&cleaned, base)? {
        return Err(DatastoreError::OutsideRoot(cleaned));
    }
    Ok(cleaned)
}

/// `VMS/<vm>` for an untenanted VM.
pub fn join_vm_dir(dirs: &DataDirs, vm: &str) -> Result<PathBuf, DatastoreError> {
    join_under(&dirs.vms, &[vm])
}

/// `VMS/<tenant>/<vm>` for a tenant-owned VM.
pub fn join_tenant_vm_dir(
    dirs: &DataDirs,
    tenant: &str,
    vm: &str,
) -> Result<PathBuf, DatastoreError> {
    join_under(&dirs.vms, &[tenant, vm])
}

/// A path inside the read-only `Images` datastore.
pub fn join_images_path(dirs: &DataDirs, rel: &str) -> Result<PathBuf, DatastoreError> {
    join_under(&dirs.images, &[rel])
}

/// Verify `p` names an existing regular file inside `Images`.
pub fn assert_readable_image(dirs: &DataDirs, p: &Path) -> Result<PathBuf, DatastoreError> {
    let cleaned = clean_abs(p)?;
    if !is_under(&cleaned, &dirs.images)? {
        return Err(DatastoreError::OutsideRoot(cleaned));
    }
    let meta = std::fs::metadata(&cleaned)
        .map_err(|_| DatastoreError::NotAFile(cleaned.clone()))?;
    if !meta.is_file() {
        return Err(DatastoreError::NotAFile(cleaned));
    }
    Ok(cleaned)
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
