// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A programmable in-memory [`ArchiveClient`], standing in for a real
//! iRODS/DMF-speaking session in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dmfd_core::Ticket;
use parking_lot::Mutex;

use super::{ArchiveClient, ArchiveError, ArchiveSession, DmfRecord, ListRecord};

#[derive(Debug, Default)]
struct MockState {
    catalog: Vec<ListRecord>,
    get_results: HashMap<String, Vec<Result<(), ArchiveError>>>,
    put_results: HashMap<String, Vec<Result<(), ArchiveError>>>,
    dmf_states: HashMap<String, String>,
    get_calls: usize,
    put_calls: usize,
}

#[derive(Clone, Default)]
pub struct MockArchiveClient {
    state: Arc<Mutex<MockState>>,
}

impl MockArchiveClient {
    pub fn new() -> MockArchiveClient {
        MockArchiveClient::default()
    }

    /// Seed the archive catalog returned by `list_objects`.
    pub fn with_catalog(self, records: Vec<ListRecord>) -> Self {
        self.state.lock().catalog = records;
        self
    }

    /// Queue the next `get` outcome for `remote_file`, consumed FIFO.
    pub fn queue_get(&self, remote_file: &str, result: Result<(), ArchiveError>) {
        self.state.lock().get_results.entry(remote_file.to_string()).or_default().push(result);
    }

    /// Queue the next `put` outcome for `remote_file`, consumed FIFO.
    pub fn queue_put(&self, remote_file: &str, result: Result<(), ArchiveError>) {
        self.state.lock().put_results.entry(remote_file.to_string()).or_default().push(result);
    }

    pub fn set_dmf_state(&self, remote_file: &str, state: &str) {
        self.state.lock().dmf_states.insert(remote_file.to_string(), state.to_string());
    }

    pub fn get_call_count(&self) -> usize {
        self.state.lock().get_calls
    }

    pub fn put_call_count(&self) -> usize {
        self.state.lock().put_calls
    }
}

#[async_trait]
impl ArchiveClient for MockArchiveClient {
    async fn session(&self, _timeout: Duration) -> Result<ArchiveSession, ArchiveError> {
        Ok(ArchiveSession { _private: () })
    }

    async fn list_objects(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<ListRecord>, ArchiveError> {
        let state = self.state.lock();
        Ok(state
            .catalog
            .iter()
            .filter(|r| r.remote_file.starts_with(prefix))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get(&self, ticket: &mut Ticket) -> Result<(), ArchiveError> {
        let result = {
            let mut state = self.state.lock();
            state.get_calls += 1;
            state
                .get_results
                .get_mut(&ticket.remote_file)
                .filter(|q| !q.is_empty())
                .map(|q| q.remove(0))
                .unwrap_or(Ok(()))
        };
        if result.is_ok() {
            ticket.transferred = ticket.remote_size.unwrap_or(0);
            ticket.transfer_time = 0.0;
        }
        result
    }

    async fn put(&self, ticket: &mut Ticket) -> Result<(), ArchiveError> {
        let result = {
            let mut state = self.state.lock();
            state.put_calls += 1;
            state
                .put_results
                .get_mut(&ticket.remote_file)
                .filter(|q| !q.is_empty())
                .map(|q| q.remove(0))
                .unwrap_or(Ok(()))
        };
        if result.is_ok() {
            ticket.transfer_time = 0.0;
        }
        result
    }

    async fn checksum(&self, ticket: &Ticket, remote_file: &str) -> Result<(), ArchiveError> {
        let state = self.state.lock();
        if let Some(record) = state.catalog.iter().find(|r| r.remote_file == remote_file) {
            if let (Some(remote_checksum), Some(local_checksum)) =
                (&record.remote_checksum, &ticket.checksum)
            {
                if !dmfd_core::remote_checksum_matches(local_checksum, remote_checksum) {
                    return Err(ArchiveError::ChecksumMismatch {
                        expected: remote_checksum.clone(),
                        actual: local_checksum.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn resolve_dmf_state(
        &self,
        pairs: &[(String, String)],
    ) -> Result<Vec<DmfRecord>, ArchiveError> {
        let state = self.state.lock();
        Ok(pairs
            .iter()
            .map(|(remote_file, local_file)| DmfRecord {
                remote_file: remote_file.clone(),
                local_file: local_file.clone(),
                dmf_state: state
                    .dmf_states
                    .get(remote_file)
                    .cloned()
                    .unwrap_or_else(|| "???".to_string()),
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
