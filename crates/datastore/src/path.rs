// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path safety predicates for the managed tree.
//!
//! Canonicalization here is lexical: targets commonly do not exist yet
//! (that is the point of the no-overwrite operations), so `fs::canonicalize`
//! is not usable. `..` and `.` components are resolved against the path
//! itself, never the filesystem.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::dirs::DataDirs;

/// Errors from managed-datastore operations.
///
/// Every refusal leaves the filesystem unchanged.
#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("empty path")]
    EmptyPath,
    #[error("path escapes managed root: {0}")]
    OutsideRoot(PathBuf),
    #[error("protected path: {0}")]
    Protected(PathBuf),
    #[error("no free name under {0}")]
    NameExhausted(PathBuf),
    #[error("not a readable file: {0}")]
    NotAFile(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Return the cleaned absolute form of `p`. Fails on empty input.
///
/// Relative paths are resolved against the current working directory;
/// `.` components are dropped and `..` pops the previous component
/// without consulting the filesystem.
pub fn clean_abs(p: &Path) -> Result<PathBuf, DatastoreError> {
    if p.as_os_str().is_empty() {
        return Err(DatastoreError::EmptyPath);
    }
    let absolute = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(prefix) => cleaned.push(prefix.as_os_str()),
            Component::RootDir => cleaned.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root
                if cleaned.parent().is_some() {
                    cleaned.pop();
                }
            }
            Component::Normal(part) => cleaned.push(part),
        }
    }
    Ok(cleaned)
}

/// True iff canonical `p` lies strictly below canonical `base`.
pub fn is_under(p: &Path, base: &Path) -> Result<bool, DatastoreError> {
    let p = clean_abs(p)?;
    let base = clean_abs(base)?;
    Ok(p != base && p.starts_with(&base))
}

/// True iff canonical `p` equals a member of the protected set.
pub fn is_protected(p: &Path, dirs: &DataDirs) -> Result<bool, DatastoreError> {
    let p = clean_abs(p)?;
    Ok(dirs.protected().iter().any(|member| p == *member))
}

/// Fail unless `p` lies under the managed root and is not itself a
/// protected directory. Returns the cleaned path. The target need not
/// exist.
pub fn assert_safe_target(p: &Path, dirs: &DataDirs) -> Result<PathBuf, DatastoreError> {
    let cleaned = clean_abs(p)?;
    if !is_under(&cleaned, &dirs.root)? {
        return Err(DatastoreError::OutsideRoot(cleaned));
    }
    if is_protected(&cleaned, dirs)? {
        return Err(DatastoreError::Protected(cleaned));
    }
    Ok(cleaned)
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
