// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The minimal contract the daemon needs from an object-archive library:
//! an async trait plus a programmable test double, no
//! real DMF/iRODS-speaking implementation.

mod mock;

pub use mock::MockArchiveClient;

use std::time::Duration;

use async_trait::async_trait;
use dmfd_core::Ticket;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors the scheduler switches on directly rather than string-sniffing
/// an exception class name.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArchiveError {
    #[error("transient error: {0}")]
    Transient(String),
    #[error("object is still on tape")]
    DmfMiss,
    #[error("checksum mismatch: expected {expected}, actual {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("{0}")]
    Other(String),
}

/// One catalog entry, as returned by `list_objects`. Datetimes are
/// already seconds-since-epoch by the time they reach this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRecord {
    pub collection: String,
    pub object: String,
    pub remote_file: String,
    #[serde(default)]
    pub remote_size: Option<u64>,
    #[serde(default)]
    pub remote_checksum: Option<String>,
    #[serde(default)]
    pub remote_create_time: Option<f64>,
    #[serde(default)]
    pub remote_modify_time: Option<f64>,
    #[serde(default)]
    pub remote_owner_name: Option<String>,
    #[serde(default)]
    pub remote_owner_zone: Option<String>,
    #[serde(default)]
    pub remote_replica_number: Option<i32>,
    #[serde(default)]
    pub remote_replica_status: Option<String>,
}

/// One `resolve_dmf_state` reply entry, keyed back to its request pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmfRecord {
    pub remote_file: String,
    pub local_file: String,
    #[serde(rename = "DMF_state")]
    pub dmf_state: String,
}

/// RAII guard for one archive session. Dropping it releases the session
/// even if the attempt that acquired it failed midway (shared-resource
/// policy").
pub struct ArchiveSession {
    _private: (),
}

/// The daemon's whole dependency on the remote object archive.
///
/// A production binary plugs in a real iRODS/DMF-speaking implementation;
/// this repository ships the trait, [`MockArchiveClient`], and nothing that
/// talks to a real DMF-backed zone (an explicit Non-goal).
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// Acquire a session with the given timeout. Every other method below
    /// implicitly requires the caller to be holding one.
    async fn session(&self, timeout: Duration) -> Result<ArchiveSession, ArchiveError>;

    /// List up to `limit` catalog entries whose remote path matches `prefix`.
    async fn list_objects(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<ListRecord>, ArchiveError>;

    /// Stream-download `ticket.remote_file` to `ticket.local_file`,
    /// incrementing `ticket.transferred` and setting `ticket.transfer_time`
    /// on completion.
    async fn get(&self, ticket: &mut Ticket) -> Result<(), ArchiveError>;

    /// Stream-upload `ticket.local_file` to `ticket.remote_file`, same
    /// progress contract as `get`. Registers a checksum on the remote side.
    async fn put(&self, ticket: &mut Ticket) -> Result<(), ArchiveError>;

    /// Fetch the remote checksum for `remote_file` and compare it against
    /// `ticket.checksum`; `ArchiveError::ChecksumMismatch` on mismatch.
    async fn checksum(&self, ticket: &Ticket, remote_file: &str) -> Result<(), ArchiveError>;

    /// Batch-resolve DMF state for `(remote_file, local_file)` pairs. Output
    /// multiset equals input multiset; iteration order is not part of
    /// the contract.
    async fn resolve_dmf_state(
        &self,
        pairs: &[(String, String)],
    ) -> Result<Vec<DmfRecord>, ArchiveError>;
}
