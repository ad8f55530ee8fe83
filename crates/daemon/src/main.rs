// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flux runner daemon (fluxd)
//!
//! Long-running process that pulls, schedules, dispatches, and supervises
//! agent tasks. Work arrives through the store's live subscription, a
//! periodic drain ticker, and server push; all dispatch paths share one
//! active-session set.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use flux_adapters::PushEvent;
use flux_daemon::config::Config;
use flux_daemon::lifecycle::{self, LifecycleError, StartupResult};
use std::path::Path;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("fluxd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("fluxd {}", env!("CARGO_PKG_VERSION"));
                println!("Flux runner daemon - schedules and supervises agent tasks");
                println!();
                println!("USAGE:");
                println!("    fluxd");
                println!();
                println!("Configuration comes from the environment (CONVEX_URL is");
                println!("required) and ~/.flux/config.json.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: fluxd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    rotate_log_if_needed(&config.log_path);
    let log_guard = setup_logging(&config)?;

    info!("starting flux runner daemon");

    let StartupResult {
        supervisor,
        drain,
        push,
        intake,
        feedback,
        device_id,
        lock_file: _lock_file,
    } = match lifecycle::startup(&config).await {
        Ok(result) => result,
        Err(LifecycleError::LockFailed(path)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("fluxd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            eprintln!("  lock: {path}");
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    info!(device_id = %device_id, "daemon ready");

    // Wire push wake-ups into the drain loop.
    if let Some(push) = &push {
        let mut events = push.start();
        let drain_for_push = std::sync::Arc::clone(&drain);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    PushEvent::TaskAvailable(available) => {
                        info!(task_id = %available.task_id, "push: task available");
                        drain_for_push.trigger_now();
                    }
                    PushEvent::Connected => info!("push connected"),
                    PushEvent::Disconnected => info!("push disconnected"),
                    PushEvent::Error(e) => info!(error = %e, "push error"),
                }
            }
        });
    }

    supervisor.start();
    drain.start();
    if let Some(intake) = &intake {
        intake.start();
    }
    if let Some(feedback) = &feedback {
        feedback.start();
    }

    // Signal ready for parent process (CLI waiting for startup)
    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    // Graceful shutdown: stop intake first, then dispatchers, then kill
    // active sessions via the supervisor.
    if let Some(push) = &push {
        push.stop();
    }
    if let Some(intake) = &intake {
        intake.stop();
    }
    if let Some(feedback) = &feedback {
        feedback.stop();
    }
    drain.stop();
    supervisor.stop().await;

    info!("daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` → `daemon.log.1` → `daemon.log.2` → `daemon.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently ignored
/// so the daemon still starts.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let dir = config
        .log_path
        .parent()
        .ok_or_else(|| std::io::Error::other("log path has no parent"))?;
    let name = config
        .log_path
        .file_name()
        .ok_or_else(|| std::io::Error::other("log path has no file name"))?;
    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let ansi = std::env::var_os("NO_COLOR").is_none();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(ansi).with_writer(non_blocking))
        .init();

    Ok(guard)
}
