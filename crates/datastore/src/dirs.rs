// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The managed directory set rooted at `<basePath>/openhvx/`.
//!
//! Every directory in this set is protected: it may be created but never
//! renamed, deleted, or used as the direct target of a destructive
//! operation.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use hvx_core::{DatastoreDescriptor, DatastoreKind};
use tracing::warn;

use crate::path::{clean_abs, DatastoreError};

/// Name of the policy notice written into each protected directory.
pub const GUARD_FILE: &str = "DO-NOT-DELETE.txt";

const GUARD_NOTICE: &str = "This directory is managed by the OpenHVX agent.\n\
Do not rename, move, or delete it. Files retired by the agent are moved\n\
to the _trash sub-tree instead of being deleted; anything removed by hand\n\
is gone for good.\n";

/// The managed data directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirs {
    pub root: PathBuf,
    pub vms: PathBuf,
    pub vhd: PathBuf,
    pub images: PathBuf,
    pub isos: PathBuf,
    pub checkpoints: PathBuf,
    pub logs: PathBuf,
    pub trash: PathBuf,
}

impl DataDirs {
    /// Derive the managed set under `<base_path>/openhvx/`.
    pub fn under(base_path: &Path) -> Result<Self, DatastoreError> {
        let root = clean_abs(&base_path.join("openhvx"))?;
        Ok(Self {
            vms: root.join("VMS"),
            vhd: root.join("VHD"),
            images: root.join("Images"),
            isos: root.join("ISOs"),
            checkpoints: root.join("Checkpoints"),
            logs: root.join("Logs"),
            trash: root.join("_trash"),
            root,
        })
    }

    /// The protected set: every member directory, root included.
    pub fn protected(&self) -> [&Path; 8] {
        [
            &self.root,
            &self.vms,
            &self.vhd,
            &self.images,
            &self.isos,
            &self.checkpoints,
            &self.logs,
            &self.trash,
        ]
    }

    /// Create the tree and drop a guard file into each protected directory.
    ///
    /// Idempotent: existing directories are left alone and an existing
    /// guard file is never rewritten. Guard-file write failures are
    /// non-fatal; directory creation failures are returned.
    pub fn ensure_tree(&self) -> io::Result<()> {
        for dir in self.protected() {
            std::fs::create_dir_all(dir)?;
            let guard = dir.join(GUARD_FILE);
            if !guard.exists() {
                if let Err(e) = std::fs::write(&guard, GUARD_NOTICE) {
                    warn!(path = %guard.display(), error = %e, "guard file write failed");
                }
            }
        }
        Ok(())
    }

    /// Datastore descriptors advertised to action scripts.
    ///
    /// `Images` is read-only by policy; `_trash` is internal and not a
    /// datastore.
    pub fn descriptors(&self) -> Vec<DatastoreDescriptor> {
        let entry = |name: &str, kind, path: &PathBuf, read_only| DatastoreDescriptor {
            name: name.to_string(),
            kind,
            path: path.clone(),
            read_only,
        };
        vec![
            entry("root", DatastoreKind::Root, &self.root, false),
            entry("vms", DatastoreKind::Vm, &self.vms, false),
            entry("vhd", DatastoreKind::Vhd, &self.vhd, false),
            entry("images", DatastoreKind::Image, &self.images, true),
            entry("isos", DatastoreKind::Iso, &self.isos, false),
            entry(
                "checkpoints",
                DatastoreKind::Checkpoint,
                &self.checkpoints,
                false,
            ),
            entry("logs", DatastoreKind::Logs, &self.logs, false),
        ]
    }

    /// Named paths for the runtime context, keyed like the descriptors.
    pub fn paths(&self) -> BTreeMap<String, PathBuf> {
        self.descriptors()
            .into_iter()
            .map(|d| (d.name, d.path))
            .collect()
    }
}

#[cfg(test)]
#[path = "dirs_tests.rs"]
mod tests;
