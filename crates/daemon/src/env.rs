// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve the state directory: `DMFD_STATE_DIR` > `~/.DmfTransferDaemon`.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("DMFD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".DmfTransferDaemon"))
}

/// Default path to the on-disk configuration file within the state directory.
pub fn default_config_path() -> Result<PathBuf, LifecycleError> {
    Ok(state_dir()?.join("config.json"))
}

/// `tracing_subscriber::EnvFilter` directive, defaulting to `info`.
pub fn log_filter() -> String {
    std::env::var("DMFD_LOG").unwrap_or_else(|_| "info".to_string())
}

/// IPC client timeout, used by tests exercising the socket directly.
pub fn ipc_timeout() -> Duration {
    std::env::var("DMFD_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
