// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dmfd` - transfer daemon entrypoint: start/stop/status.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dmfd_core::{ServerConfig, SystemClock};
use dmfd_daemon::archive::MockArchiveClient;
use dmfd_daemon::daemon::Daemon;
use dmfd_daemon::lifecycle::{self, DaemonStatus, LifecycleError, PidLock};
use dmfd_daemon::storage::TicketStore;
use dmfd_daemon::{env, listener, scheduler};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "dmfd", about = "DMF transfer daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon in the foreground.
    Start,
    /// Send SIGINT to a running daemon and wait for it to exit.
    Stop,
    /// Report whether the daemon is running.
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Start => start().await,
        Command::Stop => stop().await,
        Command::Status => status().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dmfd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn start() -> Result<(), LifecycleError> {
    let paths = lifecycle::Paths::resolve()?;
    std::fs::create_dir_all(&paths.state_dir)?;

    if let DaemonStatus::Running(pid) = lifecycle::status(&paths.lock_path) {
        return Err(LifecycleError::AlreadyRunning(pid));
    }

    let _guard = init_logging(Some(&paths.log_path));

    let config = if paths.config_path.exists() {
        ServerConfig::load(&paths.config_path)?
    } else {
        ServerConfig::default()
    };

    let _pid_lock = PidLock::acquire(&paths.lock_path, &paths.socket_path, &paths.log_path)?;
    let store = TicketStore::open(paths.ticket_dir.clone())?;
    let archive = Arc::new(MockArchiveClient::new());
    warn!("no real DMF/iRODS backend is wired in; serving requests against an in-memory stand-in");

    let daemon = Arc::new(Daemon::new(config, store, archive, SystemClock));
    let raw_listener = listener::bind(&paths.socket_path)?;

    let scheduler_daemon = daemon.clone();
    let scheduler_task = tokio::spawn(async move { scheduler::run(scheduler_daemon).await });

    let signal_daemon = daemon.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_daemon.request_shutdown();
        }
    });

    info!(socket = %paths.socket_path.display(), "dmfd listening");
    tokio::select! {
        () = listener::run(raw_listener, &*daemon) => {}
        () = daemon.shutdown.cancelled() => {}
    }

    scheduler_task.abort();
    signal_task.abort();
    let _ = std::fs::remove_file(&paths.socket_path);
    info!("dmfd stopped");
    Ok(())
}

async fn stop() -> Result<(), LifecycleError> {
    let paths = lifecycle::Paths::resolve()?;
    let stopped = lifecycle::stop(&paths.lock_path, std::time::Duration::from_secs(100)).await?;
    if stopped {
        println!("dmfd stopped");
    } else {
        println!("dmfd is not running");
    }
    Ok(())
}

async fn status() -> Result<(), LifecycleError> {
    let paths = lifecycle::Paths::resolve()?;
    match lifecycle::status(&paths.lock_path) {
        DaemonStatus::Running(pid) => println!("dmfd is running (pid {pid})"),
        DaemonStatus::NotRunning => println!("dmfd is not running"),
    }
    Ok(())
}

fn init_logging(log_path: Option<&Path>) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::new(env::log_filter());
    match log_path {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("daemon.log"));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
            None
        }
    }
}
