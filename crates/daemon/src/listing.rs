// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merged listing/reconciliation pipeline: local tickets first,
//! archive catalog entries second, both DMF-resolved and de-duplicated by
//! `remote_file`. `info` and `completion_list` are thin wraps around the
//! same join.

use std::collections::HashSet;

use dmfd_core::{Clock, Ticket};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::archive::ListRecord;
use crate::daemon::{CompletionCache, Daemon};
use crate::protocol::frame::ReturnCode;
use crate::protocol::{ErrorPayload, Frame, ListFilter, Request, Response};

const COMPLETION_CACHE_TTL_SECONDS: f64 = 60.0;

/// One emitted record: either a local ticket enriched with DMF state, or a
/// raw archive catalog entry enriched the same way.
#[derive(Debug, Clone, Serialize)]
pub struct ListingItem {
    pub collection: String,
    pub object: String,
    pub remote_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(rename = "DMF_state")]
    pub dmf_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_create_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_modify_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_owner_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_owner_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_replica_number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_replica_status: Option<String>,
}

impl ListingItem {
    fn from_ticket(ticket: &Ticket) -> ListingItem {
        ListingItem {
            collection: ticket.collection(),
            object: ticket.object(),
            remote_file: ticket.remote_file.clone(),
            local_file: Some(ticket.local_file.to_string_lossy().into_owned()),
            status: Some(ticket.status.as_str().to_string()),
            mode: Some(ticket.mode.as_str().to_string()),
            dmf_state: "???".to_string(),
            local_size: ticket.local_size,
            remote_size: ticket.remote_size,
            remote_checksum: ticket.checksum.clone(),
            remote_create_time: None,
            remote_modify_time: None,
            remote_owner_name: None,
            remote_owner_zone: None,
            remote_replica_number: None,
            remote_replica_status: None,
        }
    }

    fn from_archive(record: ListRecord, dmf_state: String) -> ListingItem {
        ListingItem {
            collection: record.collection,
            object: record.object,
            remote_file: record.remote_file,
            local_file: None,
            status: None,
            mode: None,
            dmf_state,
            local_size: None,
            remote_size: record.remote_size,
            remote_checksum: record.remote_checksum,
            remote_create_time: record.remote_create_time,
            remote_modify_time: record.remote_modify_time,
            remote_owner_name: record.remote_owner_name,
            remote_owner_zone: record.remote_owner_zone,
            remote_replica_number: record.remote_replica_number,
            remote_replica_status: record.remote_replica_status,
        }
    }

    /// A local copy that has gone missing is signalled by prefixing
    /// `local_file` with `"DELETED:"` rather than by a separate field.
    fn mark_deleted_if_missing(&mut self) {
        if let Some(local) = &self.local_file {
            if self.local_size.is_none() && !local.starts_with("DELETED:") {
                self.local_file = Some(format!("DELETED:{local}"));
            }
        }
    }
}

pub(crate) async fn handle_stream<C: Clock>(
    daemon: &Daemon<C>,
    request: Request,
    tx: mpsc::Sender<Frame>,
) {
    match request {
        Request::List { limit, filter } => stream_list(daemon, limit, &filter, tx).await,
        Request::CompletionList { prefix } => stream_completion_list(daemon, &prefix, tx).await,
        other => {
            let payload = ErrorPayload::new("DispatchError", format!("{other:?} is not streaming"));
            let _ = tx
                .send(Frame::new(ReturnCode::Error, serde_json::to_vec(&payload).unwrap_or_default()))
                .await;
        }
    }
}

async fn stream_list<C: Clock>(
    daemon: &Daemon<C>,
    limit: Option<usize>,
    filter: &ListFilter,
    tx: mpsc::Sender<Frame>,
) {
    for item in build_listing(daemon, limit, filter).await {
        let payload = serde_json::to_vec(&item).unwrap_or_default();
        if tx.send(Frame::new(ReturnCode::Ok, payload)).await.is_err() {
            return;
        }
    }
    let _ = tx.send(Frame::eof()).await;
}

async fn stream_completion_list<C: Clock>(daemon: &Daemon<C>, prefix: &str, tx: mpsc::Sender<Frame>) {
    for path in completion_paths(daemon).await.into_iter().filter(|p| p.starts_with(prefix)) {
        if tx.send(Frame::new(ReturnCode::Ok, path.into_bytes())).await.is_err() {
            return;
        }
    }
    let _ = tx.send(Frame::eof()).await;
}

async fn completion_paths<C: Clock>(daemon: &Daemon<C>) -> Vec<String> {
    let now = daemon.clock.unix_seconds();
    {
        let cache = daemon.completion_cache.lock();
        if let Some(cached) = cache.as_ref() {
            if now - cached.fetched_at_unix < COMPLETION_CACHE_TTL_SECONDS {
                return cached.paths.clone();
            }
        }
    }
    let records = daemon.archive.list_objects("", usize::MAX).await.unwrap_or_default();
    let paths: Vec<String> = records.into_iter().map(|r| r.remote_file).collect();
    *daemon.completion_cache.lock() =
        Some(CompletionCache { paths: paths.clone(), fetched_at_unix: now });
    paths
}

/// The shared join behind `list` and `info`: local tickets first
/// (status-class then creation-time order), then archive catalog entries
/// not already emitted, both DMF-resolved, capped at `limit`.
async fn build_listing<C: Clock>(
    daemon: &Daemon<C>,
    limit: Option<usize>,
    filter: &ListFilter,
) -> Vec<ListingItem> {
    let mut remaining = limit.unwrap_or(usize::MAX);
    let mut emitted: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    let mut ticket_items = local_ticket_items(daemon, filter.active);
    ticket_items.sort_by_key(|(ticket, _)| ticket.order_key());

    let pairs: Vec<(String, String)> = ticket_items
        .iter()
        .map(|(t, _)| (t.remote_file.clone(), t.local_file.to_string_lossy().into_owned()))
        .collect();
    let dmf_by_remote = resolve_dmf_map(daemon, &pairs).await;

    for (ticket, mut item) in ticket_items {
        if remaining == 0 {
            break;
        }
        item.dmf_state =
            dmf_by_remote.get(ticket.remote_file.as_str()).cloned().unwrap_or_else(|| "???".to_string());
        item.mark_deleted_if_missing();
        emitted.insert(ticket.remote_file.clone());
        out.push(item);
        remaining -= 1;
    }

    if remaining > 0 && !filter.active {
        let arglimit = remaining.saturating_mul(2).min(10_000);
        if let Ok(records) = daemon.archive.list_objects("", arglimit).await {
            let fresh: Vec<ListRecord> =
                records.into_iter().filter(|r| !emitted.contains(&r.remote_file)).collect();
            let pairs: Vec<(String, String)> =
                fresh.iter().map(|r| (r.remote_file.clone(), String::new())).collect();
            let dmf_by_remote = resolve_dmf_map(daemon, &pairs).await;
            for record in fresh {
                if remaining == 0 {
                    break;
                }
                let dmf_state =
                    dmf_by_remote.get(record.remote_file.as_str()).cloned().unwrap_or_else(|| "???".to_string());
                out.push(ListingItem::from_archive(record, dmf_state));
                remaining -= 1;
            }
        }
    }

    out
}

async fn resolve_dmf_map<C: Clock>(
    daemon: &Daemon<C>,
    pairs: &[(String, String)],
) -> std::collections::HashMap<String, String> {
    if pairs.is_empty() {
        return std::collections::HashMap::new();
    }
    daemon
        .archive
        .resolve_dmf_state(pairs)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|r| (r.remote_file, r.dmf_state))
        .collect()
}

fn local_ticket_items<C: Clock>(daemon: &Daemon<C>, active_only: bool) -> Vec<(Ticket, ListingItem)> {
    let store = daemon.store.lock();
    store
        .all()
        .filter(|t| !active_only || t.is_active())
        .map(|t| (t.clone(), ListingItem::from_ticket(t)))
        .collect()
}

/// `info` = `list` restricted to one `(collection, object)` pair, limit 1
/// Returns the matching item, or an empty JSON object.
pub(crate) async fn info<C: Clock>(daemon: &Daemon<C>, remote_file: &str) -> Response {
    if let Some(mut item) = ticket_item_for(daemon, remote_file) {
        item.mark_deleted_if_missing();
        return Response::Info(serde_json::to_value(&item).unwrap_or_default());
    }
    match archive_item_for(daemon, remote_file).await {
        Some(item) => Response::Info(serde_json::to_value(&item).unwrap_or_default()),
        None => Response::Info(serde_json::json!({})),
    }
}

fn ticket_item_for<C: Clock>(daemon: &Daemon<C>, remote_file: &str) -> Option<ListingItem> {
    let store = daemon.store.lock();
    store.all().find(|t| t.remote_file == remote_file).map(ListingItem::from_ticket)
}

async fn archive_item_for<C: Clock>(daemon: &Daemon<C>, remote_file: &str) -> Option<ListingItem> {
    let collection = std::path::Path::new(remote_file).parent()?.to_string_lossy().into_owned();
    let records = daemon.archive.list_objects(&collection, 1024).await.ok()?;
    let record = records.into_iter().find(|r| r.remote_file == remote_file)?;
    let pairs = vec![(record.remote_file.clone(), String::new())];
    let dmf_state = resolve_dmf_map(daemon, &pairs)
        .await
        .remove(&record.remote_file)
        .unwrap_or_else(|| "???".to_string());
    Some(ListingItem::from_archive(record, dmf_state))
}

#[cfg(test)]
#[path = "listing_tests.rs"]
mod tests;
