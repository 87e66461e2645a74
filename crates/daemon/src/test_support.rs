// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for the daemon crate's unit tests.

use std::sync::Arc;

use dmfd_core::{FakeClock, ServerConfig};

use crate::archive::MockArchiveClient;
use crate::daemon::Daemon;
use crate::storage::TicketStore;

/// A `Daemon` over a scratch ticket directory, a fresh `MockArchiveClient`,
/// and a `FakeClock` pinned at `FakeClock::default()`'s epoch.
pub(crate) fn test_daemon(dir: &std::path::Path) -> Daemon<FakeClock> {
    test_daemon_with_archive(dir, MockArchiveClient::new())
}

pub(crate) fn test_daemon_with_archive(
    dir: &std::path::Path,
    archive: MockArchiveClient,
) -> Daemon<FakeClock> {
    let store = TicketStore::open(dir.join("tickets")).unwrap();
    Daemon::new(ServerConfig::default(), store, Arc::new(archive), FakeClock::new())
}
