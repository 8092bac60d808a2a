// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::dirs::DataDirs;
use std::io::Read;
use tempfile::tempdir;

fn managed() -> (tempfile::TempDir, DataDirs) {
    let tmp = tempdir().unwrap();
    let dirs = DataDirs::under(tmp.path()).unwrap();
    dirs.ensure_tree().unwrap();
    (tmp, dirs)
}

#[test]
fn mkdir_all_creates_intermediates() {
    let (_tmp, dirs) = managed();
    let target = dirs.vms.join("tenant/vm-1");
    let created = safe_mkdir_all(&dirs, &target).unwrap();
    assert!(created.is_dir());
}

#[test]
fn mkdir_all_refuses_protected_and_outside() {
    let (tmp, dirs) = managed();
    assert!(safe_mkdir_all(&dirs, &dirs.vms).is_err());
    assert!(safe_mkdir_all(&dirs, &tmp.path().join("x")).is_err());
}

#[test]
fn create_file_allocates_unique_names() {
    let (_tmp, dirs) = managed();
    let desired = dirs.vms.join("a.txt");

    let (file, first) = safe_create_file(&dirs, &desired).unwrap();
    drop(file);
    assert_eq!(first, desired);

    let (file, second) = safe_create_file(&dirs, &desired).unwrap();
    drop(file);
    assert_eq!(second, dirs.vms.join("a (1).txt"));
}

#[test]
fn atomic_write_first_and_second_call() {
    let (_tmp, dirs) = managed();
    let desired = dirs.vms.join("a.txt");

    let first = safe_write_file_atomic_unique(&dirs, &desired, b"one").unwrap();
    let second = safe_write_file_atomic_unique(&dirs, &desired, b"two").unwrap();

    assert_eq!(first, dirs.vms.join("a.txt"));
    assert_eq!(second, dirs.vms.join("a (1).txt"));
    assert_eq!(std::fs::read(&first).unwrap(), b"one");
    assert_eq!(std::fs::read(&second).unwrap(), b"two");
}

#[test]
fn atomic_write_leaves_no_temp_files() {
    let (_tmp, dirs) = managed();
    safe_write_file_atomic_unique(&dirs, &dirs.vms.join("a.txt"), b"data").unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(&dirs.vms)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn atomic_write_refuses_protected_target() {
    let (_tmp, dirs) = managed();
    let before = std::fs::read_dir(&dirs.root).unwrap().count();
    assert!(safe_write_file_atomic_unique(&dirs, &dirs.images, b"x").is_err());
    assert_eq!(std::fs::read_dir(&dirs.root).unwrap().count(), before);
}

#[test]
fn rename_resolves_collisions_without_overwrite() {
    let (_tmp, dirs) = managed();
    let src = dirs.isos.join("img.iso");
    let dst = dirs.vms.join("img.iso");
    std::fs::write(&src, b"payload").unwrap();
    std::fs::write(&dst, b"existing").unwrap();

    let landed = safe_rename_no_overwrite(&dirs, &src, &dst).unwrap();
    assert_eq!(landed, dirs.vms.join("img (1).iso"));
    assert_eq!(std::fs::read(&landed).unwrap(), b"payload");
    // the original destination is untouched
    assert_eq!(std::fs::read(&dst).unwrap(), b"existing");
    assert!(!src.exists());
}

#[test]
fn rename_refuses_protected_source() {
    let (_tmp, dirs) = managed();
    assert!(safe_rename_no_overwrite(&dirs, &dirs.vms, &dirs.vhd.join("x")).is_err());
    assert!(dirs.vms.is_dir());
}

#[test]
fn copy_streams_bytes_and_keeps_source() {
    let (_tmp, dirs) = managed();
    let src = dirs.isos.join("img.iso");
    let dst = dirs.vms.join("img.iso");
    std::fs::write(&src, b"payload").unwrap();

    let landed = safe_copy_file_no_overwrite(&dirs, &src, &dst).unwrap();
    assert_eq!(landed, dst);

    let mut copied = Vec::new();
    File::open(&landed)
        .unwrap()
        .read_to_end(&mut copied)
        .unwrap();
    assert_eq!(copied, b"payload");
    assert!(src.exists());
}
