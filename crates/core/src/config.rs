// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk server configuration: parsed once at startup, immutable
//! for the daemon's lifetime.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(std::path::PathBuf, std::io::Error),
    #[error("config file {0} is not valid JSON: {1}")]
    Parse(std::path::PathBuf, serde_json::Error),
}

/// Raw on-disk shape. Every field is optional; missing keys fall back to
/// `ServerConfig`'s defaults rather than failing the load.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    irods_host: Option<String>,
    irods_port: Option<u16>,
    irods_zone_name: Option<String>,
    irods_user_name: Option<String>,
    is_resource_server: Option<bool>,
    connection_timeout: Option<u64>,
    resource_name: Option<String>,
    housekeeping: Option<u64>,
    stop_timeout: Option<u64>,
    tick_interval: Option<u64>,
}

/// Immutable server configuration for one daemon run.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub irods_host: String,
    pub irods_port: u16,
    pub zone: String,
    pub user: String,
    pub is_resource_server: bool,
    pub connection_timeout_secs: u64,
    pub resource_name: String,
    pub tick_interval_seconds: u64,
    pub housekeeping_interval_seconds: u64,
    pub housekeeping_keep_hours: u64,
    pub stop_timeout_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            irods_host: String::new(),
            irods_port: 1247,
            zone: String::new(),
            user: String::new(),
            is_resource_server: false,
            connection_timeout_secs: 300,
            resource_name: String::new(),
            tick_interval_seconds: 10,
            housekeeping_interval_seconds: 3600,
            housekeeping_keep_hours: 24,
            stop_timeout_minutes: 0,
        }
    }
}

impl ServerConfig {
    /// Parse `path` as the on-disk JSON configuration document, filling in
    /// defaults for anything absent. A missing or unparseable file is a
    /// startup failure; callers that want "no config yet" semantics should
    /// check for file existence themselves before calling this.
    pub fn load(path: &std::path::Path) -> Result<ServerConfig, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &std::path::Path) -> Result<ServerConfig, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        let defaults = ServerConfig::default();
        Ok(ServerConfig {
            irods_host: raw.irods_host.unwrap_or(defaults.irods_host),
            irods_port: raw.irods_port.unwrap_or(defaults.irods_port),
            zone: raw.irods_zone_name.unwrap_or(defaults.zone),
            user: raw.irods_user_name.unwrap_or(defaults.user),
            is_resource_server: raw.is_resource_server.unwrap_or(defaults.is_resource_server),
            connection_timeout_secs: raw
                .connection_timeout
                .unwrap_or(defaults.connection_timeout_secs),
            resource_name: raw.resource_name.unwrap_or(defaults.resource_name),
            tick_interval_seconds: raw.tick_interval.unwrap_or(defaults.tick_interval_seconds),
            housekeeping_interval_seconds: defaults.housekeeping_interval_seconds,
            housekeeping_keep_hours: raw.housekeeping.unwrap_or(defaults.housekeeping_keep_hours),
            stop_timeout_minutes: raw.stop_timeout.unwrap_or(defaults.stop_timeout_minutes),
        })
    }

    /// Substitute `{zone}`/`{user}` placeholders in a remote path template.
    /// Applied uniformly to both GET and PUT.
    pub fn expand_remote_path(&self, template: &str) -> String {
        template.replace("{zone}", &self.zone).replace("{user}", &self.user)
    }

    /// Default remote home used when GET is given a non-absolute path.
    pub fn default_home(&self) -> String {
        format!("/{}/home/{}", self.zone, self.user)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
