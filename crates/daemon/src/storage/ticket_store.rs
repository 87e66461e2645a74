// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk ticket directory plus the in-memory index the listener and
//! scheduler both operate against.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use base64::Engine;
use dmfd_core::{Ticket, TicketKey};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TicketStoreError {
    #[error("failed to create ticket directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("failed to read ticket directory {0}: {1}")]
    ReadDir(PathBuf, std::io::Error),
    #[error("failed to read ticket file {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("ticket file {0} is not valid JSON: {1}")]
    Parse(PathBuf, serde_json::Error),
    #[error("failed to write ticket file {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("failed to serialize ticket for {0}: {1}")]
    Serialize(PathBuf, serde_json::Error),
}

/// Deterministic ticket filename: a hash of `(mode, local_file, remote_file)`
/// (a single hash, not the historical
/// double path concatenation).
fn filename_for(key: &TicketKey, mode: dmfd_core::Mode) -> String {
    let mut hasher = Sha256::new();
    hasher.update(mode.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(key.local_file.to_string_lossy().as_bytes());
    hasher.update([0u8]);
    hasher.update(key.remote_file.as_bytes());
    let digest = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize());
    format!("{digest}.json")
}

/// In-memory ticket index backed by one JSON file per ticket on disk.
pub struct TicketStore {
    dir: PathBuf,
    tickets: HashMap<TicketKey, Ticket>,
    active: HashSet<TicketKey>,
}

impl TicketStore {
    /// Open (creating if absent) the ticket directory, loading every
    /// persisted ticket and applying the crash-recovery rewrite.
    pub fn open(dir: impl Into<PathBuf>) -> Result<TicketStore, TicketStoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| TicketStoreError::CreateDir(dir.clone(), e))?;
        let mut store = TicketStore { dir, tickets: HashMap::new(), active: HashSet::new() };
        store.load_all()?;
        Ok(store)
    }

    fn load_all(&mut self) -> Result<(), TicketStoreError> {
        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| TicketStoreError::ReadDir(self.dir.clone(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| TicketStoreError::ReadDir(self.dir.clone(), e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text =
                std::fs::read_to_string(&path).map_err(|e| TicketStoreError::Read(path.clone(), e))?;
            let mut ticket =
                Ticket::from_json(&text).map_err(|e| TicketStoreError::Parse(path.clone(), e))?;
            let recovered_status = ticket.status;
            ticket.recover_from_crash();
            if ticket.status != recovered_status {
                info!(
                    local_file = %ticket.local_file.display(),
                    remote_file = %ticket.remote_file,
                    "crash recovery: reset in-flight ticket to RETRY"
                );
            }
            self.index(ticket.clone());
            self.persist(&ticket)?;
        }
        info!(count = self.tickets.len(), "loaded ticket store");
        Ok(())
    }

    fn index(&mut self, ticket: Ticket) {
        let key = ticket.key();
        if ticket.is_active() {
            self.active.insert(key.clone());
        } else {
            self.active.remove(&key);
        }
        self.tickets.insert(key, ticket);
    }

    fn persist(&self, ticket: &Ticket) -> Result<(), TicketStoreError> {
        let path = self.path_for(ticket);
        let tmp_path = path.with_extension("json.tmp");
        let text =
            ticket.to_json().map_err(|e| TicketStoreError::Serialize(path.clone(), e))?;
        std::fs::write(&tmp_path, text).map_err(|e| TicketStoreError::Write(tmp_path.clone(), e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| TicketStoreError::Write(path, e))?;
        Ok(())
    }

    fn path_for(&self, ticket: &Ticket) -> PathBuf {
        self.dir.join(filename_for(&ticket.key(), ticket.mode))
    }

    pub fn get(&self, key: &TicketKey) -> Option<&Ticket> {
        self.tickets.get(key)
    }

    pub fn is_active(&self, key: &TicketKey) -> bool {
        self.active.contains(key)
    }

    /// Create or overwrite a ticket: persist it, then update both indices.
    pub fn upsert(&mut self, ticket: Ticket) -> Result<(), TicketStoreError> {
        self.persist(&ticket)?;
        self.index(ticket);
        Ok(())
    }

    /// Best-effort remove: index entries always go; the file removal
    /// failure is logged, not propagated.
    pub fn delete(&mut self, key: &TicketKey) {
        if let Some(ticket) = self.tickets.remove(key) {
            self.active.remove(key);
            let path = self.path_for(&ticket);
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "failed to remove ticket file");
                }
            }
        }
    }

    /// Snapshot of currently-active keys, for the scheduler to iterate over
    /// without holding the store lock for the whole tick.
    pub fn active_keys(&self) -> Vec<TicketKey> {
        self.active.iter().cloned().collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.values()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
#[path = "ticket_store_tests.rs"]
mod tests;
