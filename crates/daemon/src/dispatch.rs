// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot request handlers: `get`/`put` registration and `info`.
//! `list`/`completion_list` are streaming and live in [`crate::listing`].

use std::path::PathBuf;

use dmfd_core::{Clock, Mode, Ticket, TicketKey};
use tracing::info;

use crate::daemon::Daemon;
use crate::protocol::{ErrorPayload, RegisterResponse, Request, Response};

pub(crate) async fn handle_one_shot<C: Clock>(daemon: &Daemon<C>, request: Request) -> Response {
    match request {
        Request::Get { remote_file, local_file } => register(daemon, Mode::Get, local_file, remote_file),
        Request::Put { local_file, remote_file } => register(daemon, Mode::Put, local_file, remote_file),
        Request::Info { remote_file } => crate::listing::info(daemon, &remote_file).await,
        other => Response::Error(ErrorPayload::new(
            "DispatchError",
            format!("{other:?} is a streaming request, not a one-shot one"),
        )),
    }
}

/// Registration semantics: new identity schedules, active identity is
/// a no-op reply, terminal identity is overwritten and rescheduled.
fn register<C: Clock>(
    daemon: &Daemon<C>,
    mode: Mode,
    local_file: PathBuf,
    remote_file: String,
) -> Response {
    let remote_file = daemon.config.expand_remote_path(&remote_file);
    let remote_file = if mode == Mode::Get && !remote_file.starts_with('/') {
        format!("{}/{}", daemon.config.default_home(), remote_file)
    } else {
        remote_file
    };

    let key = TicketKey::new(local_file.clone(), remote_file.clone());
    let mut store = daemon.store.lock();
    let existing = store.get(&key).cloned();

    let outcome = match existing {
        None => {
            let ticket = Ticket::new(mode, local_file, remote_file.clone(), daemon.clock.unix_seconds());
            store.upsert(ticket.clone()).map(|()| RegisterResponse::scheduled(remote_file.clone(), ticket))
        }
        Some(ticket) if ticket.is_active() => {
            Ok(RegisterResponse::already_registered(remote_file.clone(), ticket))
        }
        Some(_) => {
            let ticket = Ticket::new(mode, local_file, remote_file.clone(), daemon.clock.unix_seconds());
            store
                .upsert(ticket.clone())
                .map(|()| RegisterResponse::rescheduled(remote_file.clone(), ticket))
        }
    };
    drop(store);

    match outcome {
        Ok(response) => {
            info!(remote_file = %remote_file, code = ?response.code, "registered transfer");
            Response::Register(response)
        }
        Err(e) => Response::Register(RegisterResponse::failed(remote_file, e.to_string())),
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
