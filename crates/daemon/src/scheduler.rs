// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler / tick loop: advances WAITING/RETRY/UNMIG tickets,
//! runs housekeeping on its own cadence, and detects idle shutdown.

use std::os::unix::fs::MetadataExt;
use std::sync::Arc;
use std::time::Duration;

use dmfd_core::{Clock, Mode, Status, Ticket};
use tracing::{info, warn};

use crate::archive::ArchiveError;
use crate::daemon::Daemon;
use crate::housekeeping;

/// Run the tick loop until the daemon's shutdown token is cancelled, either
/// by `lifecycle::stop`'s `SIGINT` handler or by the idle-shutdown rule
/// below firing from inside this loop.
pub async fn run<C: Clock + 'static>(daemon: Arc<Daemon<C>>) {
    let mut last_housekeeping = daemon.clock.unix_seconds();
    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(daemon.config.tick_interval_seconds)) => {}
            () = daemon.shutdown.cancelled() => break,
        }
        if daemon.is_stopping() {
            break;
        }
        if !run_once(&daemon, &mut last_housekeeping).await {
            break;
        }
    }
}

/// One tick: conditional housekeeping, one pass over active tickets, then
/// the idle-shutdown check. Returns `false` once the caller should stop
/// looping (idle shutdown fired).
pub(crate) async fn run_once<C: Clock>(daemon: &Daemon<C>, last_housekeeping: &mut f64) -> bool {
    let now = daemon.clock.unix_seconds();
    if now - *last_housekeeping > daemon.config.housekeeping_interval_seconds as f64 {
        housekeeping::run(daemon).await;
        *last_housekeeping = now;
    }

    tick_once(daemon).await;

    if should_shutdown_idle(daemon) {
        info!("idle timeout reached, requesting shutdown");
        daemon.request_shutdown();
        return false;
    }
    true
}

pub(crate) fn should_shutdown_idle<C: Clock>(daemon: &Daemon<C>) -> bool {
    daemon.active_ticket_count() == 0
        && daemon.config.stop_timeout_minutes > 0
        && daemon.heartbeat_age_seconds() > (daemon.config.stop_timeout_minutes * 60) as f64
}

async fn tick_once<C: Clock>(daemon: &Daemon<C>) {
    let mut tickets: Vec<Ticket> = {
        let store = daemon.store.lock();
        store
            .active_keys()
            .into_iter()
            .filter_map(|key| store.get(&key).cloned())
            .filter(|t| matches!(t.status, Status::Waiting | Status::Retry | Status::Unmig))
            .collect()
    };
    tickets.sort_by_key(|t| t.order_key());

    for ticket in tickets {
        if daemon.is_stopping() {
            break;
        }

        daemon.touch_heartbeat();
        match ticket.mode {
            Mode::Get => tick_download(daemon, ticket).await,
            Mode::Put => tick_upload(daemon, ticket).await,
        }
        daemon.touch_heartbeat();
    }
}

/// Drive a single GET ticket through one archive round trip.
async fn tick_download<C: Clock>(daemon: &Daemon<C>, mut ticket: Ticket) {
    ticket.status = Status::Getting;
    persist(daemon, &ticket);

    match daemon.archive.get(&mut ticket).await {
        Ok(()) => finish_after_checksum(daemon, ticket).await,
        Err(ArchiveError::DmfMiss) => {
            ticket.status = Status::Unmig;
            persist(daemon, &ticket);
        }
        Err(ArchiveError::Transient(msg)) => retry_or_fail(daemon, ticket, msg),
        Err(e) => {
            ticket.status = Status::Error;
            ticket.errmsg = e.to_string();
            persist(daemon, &ticket);
        }
    }
}

/// Drive a single PUT ticket through one archive round trip.
async fn tick_upload<C: Clock>(daemon: &Daemon<C>, mut ticket: Ticket) {
    if !ticket.local_file.exists() {
        ticket.status = Status::Error;
        ticket.errmsg = format!("file {} does not exist", ticket.local_file.display());
        persist(daemon, &ticket);
        return;
    }

    match dmfd_core::sha256_base64(&ticket.local_file) {
        Ok(checksum) => ticket.checksum = Some(checksum),
        Err(e) => {
            ticket.status = Status::Error;
            ticket.errmsg = e.to_string();
            persist(daemon, &ticket);
            return;
        }
    }

    ticket.status = Status::Putting;
    persist(daemon, &ticket);

    match daemon.archive.put(&mut ticket).await {
        Ok(()) => {
            if let Ok(meta) = std::fs::metadata(&ticket.local_file) {
                ticket.local_size = Some(meta.len());
                ticket.local_atime = Some(meta.atime() as f64);
                ticket.local_ctime = Some(meta.ctime() as f64);
            }
            finish_after_checksum(daemon, ticket).await;
        }
        Err(ArchiveError::DmfMiss) => {
            ticket.status = Status::Unmig;
            persist(daemon, &ticket);
        }
        Err(ArchiveError::Transient(msg)) => retry_or_fail(daemon, ticket, msg),
        Err(e) => {
            ticket.status = Status::Error;
            ticket.errmsg = e.to_string();
            persist(daemon, &ticket);
        }
    }
}

/// A ticket reaches DONE only after checksum reconciliation succeeds; a
/// mismatch is terminal rather than retryable.
async fn finish_after_checksum<C: Clock>(daemon: &Daemon<C>, mut ticket: Ticket) {
    let remote_file = ticket.remote_file.clone();
    match daemon.archive.checksum(&ticket, &remote_file).await {
        Ok(()) => {
            ticket.status = Status::Done;
            persist(daemon, &ticket);
        }
        Err(ArchiveError::ChecksumMismatch { expected, actual }) => {
            ticket.status = Status::Error;
            ticket.errmsg = format!("checksum mismatch: expected {expected}, actual {actual}");
            persist(daemon, &ticket);
        }
        Err(e) => {
            ticket.status = Status::Error;
            ticket.errmsg = e.to_string();
            persist(daemon, &ticket);
        }
    }
}

fn retry_or_fail<C: Clock>(daemon: &Daemon<C>, mut ticket: Ticket, errmsg: String) {
    ticket.errmsg = errmsg;
    if ticket.retries > 0 {
        ticket.retries -= 1;
        ticket.status = Status::Retry;
    } else {
        ticket.status = Status::Error;
    }
    persist(daemon, &ticket);
}

fn persist<C: Clock>(daemon: &Daemon<C>, ticket: &Ticket) {
    if let Err(e) = daemon.store.lock().upsert(ticket.clone()) {
        warn!(
            local_file = %ticket.local_file.display(),
            remote_file = %ticket.remote_file,
            error = %e,
            "failed to persist ticket during tick"
        );
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
