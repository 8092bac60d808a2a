// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;
use yare::parameterized;

const HVX_VARS: &[&str] = &[
    "HVX_STATE_DIR",
    "HVX_CONFIG",
    "HVX_AGENT_ID",
    "HVX_BROKER_URL",
    "HVX_BASE_PATH",
    "HVX_HEARTBEAT_SECS",
    "HVX_INVENTORY_SECS",
    "HVX_CAPABILITIES",
    "HVX_ACTIONS_ROOT",
];

fn clear_env() {
    for var in HVX_VARS {
        std::env::remove_var(var);
    }
}

#[parameterized(
    positive = { Some(45), 45 },
    zero = { Some(0), 30 },
    negative = { Some(-5), 30 },
    unset = { None, 30 },
)]
fn interval_clamps_to_default(secs: Option<i64>, expected: u64) {
    assert_eq!(
        clamp_interval(secs, DEFAULT_HEARTBEAT_SECS),
        Duration::from_secs(expected)
    );
}

#[test]
fn capability_clamps() {
    assert_eq!(clamp_capabilities(None), default_capabilities());
    assert_eq!(clamp_capabilities(Some(vec![])), default_capabilities());
    assert_eq!(
        clamp_capabilities(Some(vec!["  ".to_string(), String::new()])),
        default_capabilities()
    );
    assert_eq!(
        clamp_capabilities(Some(vec![" vm.stop ".to_string()])),
        vec!["vm.stop".to_string()]
    );
}

#[test]
#[serial]
fn load_with_defaults() {
    clear_env();
    let state = tempdir().unwrap();
    std::env::set_var("HVX_STATE_DIR", state.path());
    std::env::set_var("HVX_AGENT_ID", "HOST-A");

    let config = Config::load().unwrap();
    clear_env();

    assert_eq!(config.agent_id, "HOST-A");
    assert_eq!(config.broker_url, DEFAULT_BROKER_URL);
    assert_eq!(config.base_path, state.path());
    assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
    assert_eq!(config.inventory_interval, Duration::from_secs(60));
    assert_eq!(config.capabilities, default_capabilities());
    assert_eq!(config.lock_path, state.path().join("agent.pid"));
    assert_eq!(config.log_path, state.path().join("agent.log"));
}

#[test]
#[serial]
fn load_reads_config_file() {
    clear_env();
    let state = tempdir().unwrap();
    std::fs::write(
        state.path().join("agent.toml"),
        concat!(
            "agent_id = \"HOST-FILE\"\n",
            "broker_url = \"amqp://bus.internal:5672/%2f\"\n",
            "heartbeat_interval_secs = 10\n",
            "inventory_interval_secs = 120\n",
            "capabilities = [\"inventory\", \"vm.power\", \"vm.checkpoint\"]\n",
        ),
    )
    .unwrap();
    std::env::set_var("HVX_STATE_DIR", state.path());

    let config = Config::load().unwrap();
    clear_env();

    assert_eq!(config.agent_id, "HOST-FILE");
    assert_eq!(config.broker_url, "amqp://bus.internal:5672/%2f");
    assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
    assert_eq!(config.inventory_interval, Duration::from_secs(120));
    assert_eq!(config.capabilities.len(), 3);
}

#[test]
#[serial]
fn env_overrides_file() {
    clear_env();
    let state = tempdir().unwrap();
    std::fs::write(
        state.path().join("agent.toml"),
        "agent_id = \"HOST-FILE\"\nheartbeat_interval_secs = 10\n",
    )
    .unwrap();
    std::env::set_var("HVX_STATE_DIR", state.path());
    std::env::set_var("HVX_AGENT_ID", "HOST-ENV");
    std::env::set_var("HVX_HEARTBEAT_SECS", "7");
    std::env::set_var("HVX_CAPABILITIES", "inventory, vm.power ,vm.stop");

    let config = Config::load().unwrap();
    clear_env();

    assert_eq!(config.agent_id, "HOST-ENV");
    assert_eq!(config.heartbeat_interval, Duration::from_secs(7));
    assert_eq!(
        config.capabilities,
        vec!["inventory", "vm.power", "vm.stop"]
    );
}

#[test]
#[serial]
fn malformed_config_file_is_surfaced() {
    clear_env();
    let state = tempdir().unwrap();
    std::fs::write(state.path().join("agent.toml"), "not toml {{{").unwrap();
    std::env::set_var("HVX_STATE_DIR", state.path());

    let err = Config::load().unwrap_err();
    clear_env();

    assert!(matches!(err, LifecycleError::Config { .. }));
}

#[test]
#[serial]
fn zero_intervals_clamp_via_file_too() {
    clear_env();
    let state = tempdir().unwrap();
    std::fs::write(
        state.path().join("agent.toml"),
        "agent_id = \"H\"\nheartbeat_interval_secs = 0\ninventory_interval_secs = -1\n",
    )
    .unwrap();
    std::env::set_var("HVX_STATE_DIR", state.path());

    let config = Config::load().unwrap();
    clear_env();

    assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
    assert_eq!(config.inventory_interval, Duration::from_secs(60));
}

fn test_config(state: &std::path::Path) -> Config {
    Config {
        agent_id: "HOST-A".to_string(),
        broker_url: DEFAULT_BROKER_URL.to_string(),
        base_path: state.to_path_buf(),
        heartbeat_interval: Duration::from_secs(30),
        inventory_interval: Duration::from_secs(60),
        capabilities: default_capabilities(),
        actions_root: None,
        state_dir: state.to_path_buf(),
        lock_path: state.join("agent.pid"),
        version_path: state.join("agent.version"),
        log_path: state.join("agent.log"),
    }
}

#[test]
fn startup_locks_ensures_tree_and_builds_context() {
    let state = tempdir().unwrap();
    let config = test_config(state.path());

    let boot = startup(&config).unwrap();

    // pid file holds our pid
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());

    // version file written
    let version = std::fs::read_to_string(&config.version_path).unwrap();
    assert_eq!(version, crate::env::AGENT_VERSION);

    // managed tree exists
    assert!(boot.dirs.root.is_dir());
    assert!(boot.dirs.vms.is_dir());

    // context is populated
    assert_eq!(boot.context.agent_id, "HOST-A");
    assert_eq!(boot.context.datastores.len(), 7);
    assert!(!boot.host.is_empty());
}

#[test]
fn second_startup_fails_on_lock() {
    let state = tempdir().unwrap();
    let config = test_config(state.path());

    let _boot = startup(&config).unwrap();
    let err = startup(&config).unwrap_err();
    assert!(matches!(err, LifecycleError::LockFailed(_)));
}

#[test]
fn startup_is_idempotent_after_release() {
    let state = tempdir().unwrap();
    let config = test_config(state.path());

    let boot = startup(&config).unwrap();
    let guard = boot.dirs.vms.join(hvx_datastore::GUARD_FILE);
    std::fs::write(&guard, "custom").unwrap();
    drop(boot);

    // lock released, tree untouched
    let _boot = startup(&config).unwrap();
    assert_eq!(std::fs::read_to_string(&guard).unwrap(), "custom");
}

#[test]
fn dry_run_builds_context_without_locking() {
    let state = tempdir().unwrap();
    let config = test_config(state.path());

    let context = dry_run(&config).unwrap();

    assert_eq!(context.agent_id, "HOST-A");
    assert!(state.path().join("openhvx/VMS").is_dir());
    assert!(!config.lock_path.exists());
}
