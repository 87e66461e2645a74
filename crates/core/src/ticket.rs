// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ticket: identity, status machine, and JSON persistence shape for one
//! queued or in-flight transfer between the local filesystem and the
//! archive.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Get,
    Put,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Get => "GET",
            Mode::Put => "PUT",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Mode> {
        match s {
            "GET" => Some(Mode::Get),
            "PUT" => Some(Mode::Put),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Waiting,
    Getting,
    Putting,
    Retry,
    Canceled,
    Error,
    Undef,
    Done,
    Unmig,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Waiting => "WAITING",
            Status::Getting => "GETTING",
            Status::Putting => "PUTTING",
            Status::Retry => "RETRY",
            Status::Canceled => "CANCELED",
            Status::Error => "ERROR",
            Status::Undef => "UNDEF",
            Status::Done => "DONE",
            Status::Unmig => "UNMIG",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Status> {
        match s {
            "WAITING" => Some(Status::Waiting),
            "GETTING" => Some(Status::Getting),
            "PUTTING" => Some(Status::Putting),
            "RETRY" => Some(Status::Retry),
            "CANCELED" => Some(Status::Canceled),
            "ERROR" => Some(Status::Error),
            "UNDEF" => Some(Status::Undef),
            "DONE" => Some(Status::Done),
            "UNMIG" => Some(Status::Unmig),
            _ => None,
        }
    }

    /// A ticket in this status is still being worked by the scheduler.
    pub fn is_active(self) -> bool {
        matches!(self, Status::Waiting | Status::Getting | Status::Putting | Status::Retry | Status::Unmig)
    }

    /// Index into the processing order used to sort a tick's work queue:
    /// new work first, terminal states last.
    fn sort_index(self) -> u8 {
        match self {
            Status::Waiting => 0,
            Status::Getting => 1,
            Status::Putting => 2,
            Status::Retry => 3,
            Status::Unmig => 4,
            Status::Canceled => 5,
            Status::Error => 6,
            Status::Undef => 7,
            Status::Done => 8,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compound identity of a ticket: the `(local_file, remote_file)` pair.
/// Used directly as a `HashMap` key rather than a composed string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicketKey {
    pub local_file: PathBuf,
    pub remote_file: String,
}

impl TicketKey {
    pub fn new(local_file: impl Into<PathBuf>, remote_file: impl Into<String>) -> Self {
        Self { local_file: local_file.into(), remote_file: remote_file.into() }
    }
}

/// One queued or in-flight transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub mode: Mode,
    pub status: Status,
    pub local_file: PathBuf,
    pub remote_file: String,
    pub time_created: f64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default)]
    pub transferred: u64,
    #[serde(default)]
    pub transfer_time: f64,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub local_atime: Option<f64>,
    #[serde(default)]
    pub local_ctime: Option<f64>,
    #[serde(default)]
    pub local_size: Option<u64>,
    #[serde(default)]
    pub remote_size: Option<u64>,
    #[serde(default)]
    pub errmsg: String,
    #[serde(rename = "DMF_state", default = "default_dmf_state")]
    pub dmf_state: String,
}

fn default_retries() -> u32 {
    3
}

fn default_dmf_state() -> String {
    "???".to_string()
}

impl Ticket {
    /// Build a freshly-scheduled ticket (`status = WAITING`, `retries = 3`).
    pub fn new(mode: Mode, local_file: PathBuf, remote_file: String, time_created: f64) -> Self {
        Ticket {
            mode,
            status: Status::Waiting,
            local_file,
            remote_file,
            time_created,
            retries: default_retries(),
            transferred: 0,
            transfer_time: 0.0,
            checksum: None,
            local_atime: None,
            local_ctime: None,
            local_size: None,
            remote_size: None,
            errmsg: String::new(),
            dmf_state: default_dmf_state(),
        }
    }

    pub fn key(&self) -> TicketKey {
        TicketKey::new(self.local_file.clone(), self.remote_file.clone())
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// `dirname(remote_file)`, used by the listing pipeline to join against
    /// archive catalog entries.
    pub fn collection(&self) -> String {
        Path::new(&self.remote_file)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `basename(remote_file)`.
    pub fn object(&self) -> String {
        Path::new(&self.remote_file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Apply the crash-recovery rewrite: a ticket found in an in-flight
    /// status at startup could not have survived the crash, so it is
    /// reset to RETRY with a full retry budget.
    pub fn recover_from_crash(&mut self) {
        if matches!(self.status, Status::Getting | Status::Putting) {
            self.status = Status::Retry;
            self.retries = default_retries();
            self.transferred = 0;
        }
    }

    /// Stable ordering key for a tick's work queue: status class first,
    /// then creation time ascending within a class.
    pub fn order_key(&self) -> (u8, i64) {
        (self.status.sort_index(), (self.time_created * 1000.0) as i64)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Ticket> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "ticket_tests.rs"]
mod tests;
