// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-overwrite create, write, rename, and copy operations.
//!
//! Every operation validates its target against the managed tree first,
//! then allocates a unique name. Overwrite prevention rests on exclusive
//! create (`create_new`) and on renaming onto freshly probed names; the
//! probe only improves the chosen name.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::dirs::DataDirs;
use crate::path::{assert_safe_target, DatastoreError};
use crate::unique::unique_path;

/// Create `dir` and any missing intermediates. `dir` must lie under the
/// managed root and must not be a protected directory itself.
pub fn safe_mkdir_all(dirs: &DataDirs, dir: &Path) -> Result<PathBuf, DatastoreError> {
    let dir = assert_safe_target(dir, dirs)?;
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Open a fresh file exclusively for write. Returns the handle and the
/// chosen unique path.
pub fn safe_create_file(dirs: &DataDirs, dst: &Path) -> Result<(File, PathBuf), DatastoreError> {
    let dst = assert_safe_target(dst, dirs)?;
    let dst = unique_path(&dst)?;
    let file = OpenOptions::new().write(true).create_new(true).open(&dst)?;
    Ok((file, dst))
}

/// Write `data` to a same-directory temp file, sync, and rename onto a
/// unique destination. The temp file is removed on any failure; no file
/// other than the returned one is created or modified in the target
/// directory.
pub fn safe_write_file_atomic_unique(
    dirs: &DataDirs,
    dst: &Path,
    data: &[u8],
) -> Result<PathBuf, DatastoreError> {
    let dst = assert_safe_target(dst, dirs)?;
    let parent = dst
        .parent()
        .ok_or_else(|| DatastoreError::OutsideRoot(dst.clone()))?;

    let tmp = parent.join(format!(".{}.tmp", Uuid::new_v4()));
    let result = write_then_rename(&tmp, &dst, data);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_then_rename(tmp: &Path, dst: &Path, data: &[u8]) -> Result<PathBuf, DatastoreError> {
    {
        let mut file = OpenOptions::new().write(true).create_new(true).open(tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    let unique = unique_path(dst)?;
    fs::rename(tmp, &unique)?;
    Ok(unique)
}

/// Atomic rename where the destination is resolved to a unique name.
/// Both ends must be safe targets. Fails verbatim when the rename is
/// impossible (e.g. across devices); callers fall back to
/// [`safe_copy_file_no_overwrite`] in that case.
pub fn safe_rename_no_overwrite(
    dirs: &DataDirs,
    src: &Path,
    dst: &Path,
) -> Result<PathBuf, DatastoreError> {
    let src = assert_safe_target(src, dirs)?;
    let dst = assert_safe_target(dst, dirs)?;
    let dst = unique_path(&dst)?;
    fs::rename(&src, &dst)?;
    Ok(dst)
}

/// Stream `src` into a uniquely named, exclusively created destination.
/// The source is left in place.
pub fn safe_copy_file_no_overwrite(
    dirs: &DataDirs,
    src: &Path,
    dst: &Path,
) -> Result<PathBuf, DatastoreError> {
    let src = assert_safe_target(src, dirs)?;
    let dst = assert_safe_target(dst, dirs)?;
    let dst = unique_path(&dst)?;

    let mut reader = File::open(&src)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(&dst)?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;
    Ok(dst)
}

#[cfg(test)]
#[path = "write_tests.rs"]
mod tests;
