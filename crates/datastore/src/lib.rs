// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hvx-datastore: the managed-datastore filesystem layer.
//!
//! The only sanctioned way to create, write, rename, or retire files and
//! directories under the managed tree. The invariant is "no data loss":
//! nothing in the tree is ever overwritten, and nothing is unlinked
//! outside the internal `_trash` sub-tree.

pub mod dirs;
pub mod layout;
pub mod path;
pub mod trash;
pub mod unique;
pub mod write;

pub use dirs::{DataDirs, GUARD_FILE};
pub use layout::{assert_readable_image, join_images_path, join_tenant_vm_dir, join_vm_dir};
pub use path::{assert_safe_target, clean_abs, is_protected, is_under, DatastoreError};
pub use trash::move_to_trash;
pub use unique::unique_path;
pub use write::{
    safe_copy_file_no_overwrite, safe_create_file, safe_mkdir_all, safe_rename_no_overwrite,
    safe_write_file_atomic_unique,
};
