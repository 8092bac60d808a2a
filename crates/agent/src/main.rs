// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenHVX host agent daemon (hvx-agentd)
//!
//! Long-running process that mediates between the control plane and the
//! local hypervisor.
//!
//! Architecture:
//! - Consumer Task: supervised consume loop feeding the task pipeline
//! - Heartbeat / Inventory Tickers: periodic telemetry publication
//! - Light-Refresh Workers: one spawned task per completed job

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use hvx_actions::PwshInvoker;
use hvx_agent::env::AGENT_VERSION;
use hvx_agent::lifecycle::{self, Config, LifecycleError};
use hvx_agent::{startup, TaskPipeline, Telemetry};
use hvx_broker::{run_consumer, BrokerSession, ConsumerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("hvx-agentd {AGENT_VERSION}");
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            "--dry-run" => {
                let config = Config::load()?;
                let context = lifecycle::dry_run(&config)?;
                println!("{}", serde_json::to_string_pretty(&context)?);
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: hvx-agentd [--help | --version | --dry-run]");
                std::process::exit(1);
            }
        }
    }

    // Load configuration
    let config = Config::load()?;

    // Rotate log file if it has grown too large
    rotate_log_if_needed(&config.log_path);

    // Write startup marker to log (before tracing setup, so operators can
    // find where the current attempt begins)
    write_startup_marker(&config)?;

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!(version = AGENT_VERSION, agent_id = %config.agent_id, "starting agent");

    // Lock, managed tree, hostname, runtime context
    let boot = match startup(&config) {
        Ok(boot) => boot,
        Err(LifecycleError::LockFailed(_)) => {
            // Another agent is already running — print a human-readable
            // message instead of a raw debug error.
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            let version = std::fs::read_to_string(&config.version_path)
                .unwrap_or_default()
                .trim()
                .to_string();

            eprintln!("hvx-agentd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            if !version.is_empty() {
                if version == AGENT_VERSION {
                    eprintln!("  version: {version}");
                } else {
                    eprintln!("  version: {version} (outdated — current: {AGENT_VERSION})");
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may
            // not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start agent: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Establish the broker session (bounded retries inside); a bus that
    // never comes up is fatal.
    let session = Arc::new(BrokerSession::connect(&config.broker_url).await?);

    // Locate the action interpreter and script root
    let runner = Arc::new(PwshInvoker::discover(config.actions_root.clone())?);

    let telemetry = Arc::new(Telemetry::new(
        boot.host.clone(),
        config.capabilities.clone(),
        Arc::clone(&boot.context),
        Arc::clone(&session),
        Arc::clone(&runner),
    ));
    let pipeline = Arc::new(TaskPipeline::new(
        Arc::clone(&boot.context),
        Arc::clone(&session),
        Arc::clone(&runner),
        Arc::clone(&telemetry),
    ));

    let shutdown = CancellationToken::new();

    // Spawn telemetry tickers
    tokio::spawn(
        Arc::clone(&telemetry).run_heartbeat(config.heartbeat_interval, shutdown.clone()),
    );
    tokio::spawn(
        Arc::clone(&telemetry).run_inventory(config.inventory_interval, shutdown.clone()),
    );

    // Spawn the supervised task consumer
    let consumer = {
        let session = Arc::clone(&session);
        let consumer_cfg = ConsumerConfig::for_agent(&config.agent_id);
        let pipeline = Arc::clone(&pipeline);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            run_consumer(&session, &consumer_cfg, pipeline.as_ref(), &shutdown).await;
        })
    };

    info!(agent_id = %config.agent_id, "agent ready");

    // Signal ready for parent process (e.g. systemd, provisioning scripts)
    println!("READY");

    wait_for_shutdown().await?;

    // Graceful drain: tickers stop, the consume loop exits on its next
    // poll, in-flight publications finish before the session closes.
    shutdown.cancel();
    let _ = consumer.await;
    session.close().await;

    info!("Agent stopped");
    drop(log_guard);
    Ok(())
}

fn print_help() {
    println!("hvx-agentd {AGENT_VERSION}");
    println!("OpenHVX host agent - mediates between the control plane and the local hypervisor");
    println!();
    println!("USAGE:");
    println!("    hvx-agentd [--dry-run]");
    println!();
    println!("The agent is typically supervised by the host init system. It");
    println!("consumes job messages from the bus, runs hypervisor action");
    println!("scripts, and publishes telemetry and task results.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
    println!("        --dry-run    Resolve config, ensure the managed tree,");
    println!("                     print the runtime context, and exit");
}

async fn wait_for_shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl-C, shutting down...");
        Ok(())
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (agent.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the agent log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `agent.log` → `agent.log.1` → `agent.log.2` → `agent.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently
/// ignored so the agent still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    // Shift older rotations: .3 is deleted, .2→.3, .1→.2
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    // Rotate current log → .1
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- hvx-agentd: starting (pid: 12345) ---"
const STARTUP_MARKER_PREFIX: &str = "--- hvx-agentd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    // Create log directory if needed
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(
        file,
        "{}{}) ---\n",
        STARTUP_MARKER_PREFIX,
        std::process::id()
    )?;

    Ok(())
}

/// Write startup error synchronously to log file.
/// This ensures the error is visible even if the process exits quickly.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start agent: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Create log directory if needed
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Set up file appender (rotation happens at startup via rotate_log_if_needed)
    let file_appender = tracing_appender::rolling::never(
        config
            .log_path
            .parent()
            .ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
