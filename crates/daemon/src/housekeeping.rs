// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Housekeeping: age out terminal tickets whose remote object no
//! longer exists in the archive.

use std::collections::HashSet;

use dmfd_core::{Clock, TicketKey};
use tracing::{info, warn};

use crate::daemon::Daemon;

const HOUSEKEEPING_PROBE_LIMIT: usize = 1_000_000;

/// Run one housekeeping pass. Never returns an error: failures to resolve
/// the archive listing abort this pass but are logged, not propagated
/// is skipped for this pass rather than treated as fatal.
pub(crate) async fn run<C: Clock>(daemon: &Daemon<C>) {
    let remote_paths: HashSet<String> =
        match daemon.archive.list_objects("", HOUSEKEEPING_PROBE_LIMIT).await {
            Ok(records) => records.into_iter().map(|r| r.remote_file).collect(),
            Err(e) => {
                warn!(error = %e, "housekeeping: failed to list archive objects, skipping this pass");
                return;
            }
        };

    let now = daemon.clock.unix_seconds();
    let keep_seconds = (daemon.config.housekeeping_keep_hours * 3600) as f64;

    let stale: Vec<TicketKey> = {
        let store = daemon.store.lock();
        store
            .all()
            .filter(|t| !t.is_active())
            .filter(|t| !remote_paths.contains(&t.remote_file))
            .filter(|t| now - t.time_created > keep_seconds)
            .map(|t| t.key())
            .collect()
    };

    let count = stale.len();
    let mut store = daemon.store.lock();
    for key in stale {
        store.delete(&key);
    }
    if count > 0 {
        info!(count, "housekeeping: aged out stale tickets");
    }
}

#[cfg(test)]
#[path = "housekeeping_tests.rs"]
mod tests;
