// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: single-instance enforcement, PID file,
//! start/stop/status.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::env;

/// Persisted shape of the PID file: `{pid, socket_file, log_file}`.
#[derive(Debug, Serialize, Deserialize)]
struct PidFile {
    pid: u32,
    socket_file: PathBuf,
    log_file: PathBuf,
}

/// Filesystem paths the daemon touches, all derived from the state
/// directory. Distinct from [`dmfd_core::ServerConfig`], which holds
/// the daemon's *tunables* rather than its on-disk locations.
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub ticket_dir: PathBuf,
    pub log_path: PathBuf,
    pub config_path: PathBuf,
}

impl Paths {
    pub fn resolve() -> Result<Paths, LifecycleError> {
        let state_dir = env::state_dir()?;
        Ok(Paths {
            socket_path: state_dir.join("DmfTransferDaemon.socket"),
            lock_path: state_dir.join("daemon.pid"),
            ticket_dir: state_dir.join("tickets"),
            log_path: state_dir.join("daemon.log"),
            config_path: state_dir.join("config.json"),
            state_dir,
        })
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,
    #[error("daemon already running (pid {0})")]
    AlreadyRunning(u32),
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),
    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed PID file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] dmfd_core::ConfigError),
    #[error(transparent)]
    TicketStore(#[from] crate::storage::TicketStoreError),
}

/// Exclusive PID-file lock, held for the daemon's lifetime. The file is
/// removed on drop (clean shutdown); a daemon that is killed leaves a
/// stale PID file behind, which the next `start` detects via liveness
/// check rather than mere existence.
pub struct PidLock {
    _file: File,
    path: PathBuf,
}

impl PidLock {
    /// Acquire the lock and write `{pid, socket_file, log_file}` into it.
    /// Fails if another process is already holding it.
    pub fn acquire(path: &Path, socket_path: &Path, log_path: &Path) -> Result<PidLock, LifecycleError> {
        let file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
        file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
        file.set_len(0)?;
        {
            use std::io::Write;
            let mut f = &file;
            let contents = PidFile {
                pid: std::process::id(),
                socket_file: socket_path.to_path_buf(),
                log_file: log_path.to_path_buf(),
            };
            serde_json::to_writer(&mut f, &contents)?;
        }
        Ok(PidLock { _file: file, path: path.to_path_buf() })
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove PID file on shutdown");
            }
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    let text = std::fs::read_to_string(path).ok()?;
    let parsed: PidFile = serde_json::from_str(&text).ok()?;
    Some(parsed.pid)
}

fn process_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

fn send_sigint(pid: u32) -> std::io::Result<()> {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), nix::sys::signal::Signal::SIGINT)
        .map_err(|e| std::io::Error::other(e.to_string()))
}

/// Result of a `status` query against the PID file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    Running(u32),
    NotRunning,
}

/// Read the PID file and check the process is actually alive, not merely
/// that a PID file exists (a crash can leave a stale one behind).
pub fn status(lock_path: &Path) -> DaemonStatus {
    match read_pid(lock_path) {
        Some(pid) if process_alive(pid) => DaemonStatus::Running(pid),
        _ => DaemonStatus::NotRunning,
    }
}

/// Send `SIGINT` to a running daemon and wait for its PID file to
/// disappear. Returns `false` if the daemon was not running.
pub async fn stop(lock_path: &Path, wait: Duration) -> Result<bool, LifecycleError> {
    let pid = match status(lock_path) {
        DaemonStatus::NotRunning => return Ok(false),
        DaemonStatus::Running(pid) => pid,
    };
    send_sigint(pid)?;

    let poll = Duration::from_millis(100);
    let mut waited = Duration::ZERO;
    while lock_path.exists() && waited < wait {
        tokio::time::sleep(poll).await;
        waited += poll;
    }
    Ok(true)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
