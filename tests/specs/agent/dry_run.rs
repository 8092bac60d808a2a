//! Dry-run entry mode specs
//!
//! `--dry-run` resolves configuration, ensures the managed tree, prints
//! the runtime context as JSON, and exits without touching the broker.

use crate::prelude::*;

#[test]
fn dry_run_prints_runtime_context() {
    let out = agentd().isolated().args(&["--dry-run"]).passes();
    let ctx = out.json();

    assert_eq!(ctx["agentId"], "SPEC-HOST");
    assert!(ctx["basePath"].as_str().is_some());

    let datastores = ctx["datastores"].as_array().unwrap();
    assert_eq!(datastores.len(), 7);
    let images = datastores
        .iter()
        .find(|d| d["kind"] == "image")
        .expect("images datastore");
    assert_eq!(images["readOnly"], true);
}

#[test]
fn dry_run_creates_the_managed_tree() {
    let out = agentd().isolated().args(&["--dry-run"]).passes();
    let root = out.state_path().join("openhvx");

    for sub in ["VMS", "VHD", "Images", "ISOs", "Checkpoints", "Logs", "_trash"] {
        assert!(root.join(sub).is_dir(), "missing {sub}");
        assert!(
            root.join(sub).join("DO-NOT-DELETE.txt").is_file(),
            "missing guard in {sub}"
        );
    }
}

#[test]
fn dry_run_respects_base_path_override() {
    let base = tempfile::tempdir().unwrap();
    agentd()
        .isolated()
        .env("HVX_BASE_PATH", base.path().to_str().unwrap())
        .args(&["--dry-run"])
        .passes();

    assert!(base.path().join("openhvx/VMS").is_dir());
}

#[test]
fn dry_run_is_idempotent() {
    let base = tempfile::tempdir().unwrap();
    let base_str = base.path().to_str().unwrap().to_string();

    agentd()
        .isolated()
        .env("HVX_BASE_PATH", &base_str)
        .args(&["--dry-run"])
        .passes();

    // scribble on a guard file; the second run must not rewrite it
    let guard = base.path().join("openhvx/VMS/DO-NOT-DELETE.txt");
    std::fs::write(&guard, "custom").unwrap();

    agentd()
        .isolated()
        .env("HVX_BASE_PATH", &base_str)
        .args(&["--dry-run"])
        .passes();

    assert_eq!(std::fs::read_to_string(&guard).unwrap(), "custom");
}
