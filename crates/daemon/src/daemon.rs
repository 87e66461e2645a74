// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared state threaded through the listener and scheduler tasks.
//!
//! [`RequestHandler`] is the generic seam the listener is parameterized on,
//! mirroring an adapter-trait-plus-concrete-impl shape: one value
//! (`Daemon`) implements it, the listener only ever sees the trait.

use std::sync::Arc;

use async_trait::async_trait;
use dmfd_core::{Clock, ServerConfig, SystemClock};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::archive::ArchiveClient;
use crate::protocol::{Frame, Request, Response};
use crate::storage::TicketStore;

/// Cached `completion_list` snapshot, refreshed at most once per 60s.
pub(crate) struct CompletionCache {
    pub paths: Vec<String>,
    pub fetched_at_unix: f64,
}

/// Everything the listener and scheduler share for one daemon run. Held
/// behind an `Arc` by `main`; the ticket store is the only mutable shared
/// structure and is guarded by a single lock.
pub struct Daemon<C: Clock = SystemClock> {
    pub config: ServerConfig,
    pub(crate) store: Mutex<TicketStore>,
    pub(crate) archive: Arc<dyn ArchiveClient>,
    pub(crate) clock: C,
    heartbeat: Mutex<f64>,
    pub shutdown: CancellationToken,
    pub(crate) completion_cache: Mutex<Option<CompletionCache>>,
}

impl<C: Clock> Daemon<C> {
    pub fn new(
        config: ServerConfig,
        store: TicketStore,
        archive: Arc<dyn ArchiveClient>,
        clock: C,
    ) -> Daemon<C> {
        let now = clock.unix_seconds();
        Daemon {
            config,
            store: Mutex::new(store),
            archive,
            clock,
            heartbeat: Mutex::new(now),
            shutdown: CancellationToken::new(),
            completion_cache: Mutex::new(None),
        }
    }

    pub fn touch_heartbeat(&self) {
        *self.heartbeat.lock() = self.clock.unix_seconds();
    }

    /// Seconds since the last request was handled or a scheduler attempt began.
    pub fn heartbeat_age_seconds(&self) -> f64 {
        self.clock.unix_seconds() - *self.heartbeat.lock()
    }

    pub fn is_stopping(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn active_ticket_count(&self) -> usize {
        self.store.lock().active_keys().len()
    }
}

/// The seam the listener is generic over: one-shot requests resolve to a
/// single reply frame, streaming requests drain into `tx` and must end with
/// [`Frame::eof`].
#[async_trait]
pub trait RequestHandler: Send + Sync {
    fn is_stopping(&self) -> bool;
    async fn dispatch(&self, request: Request) -> Response;
    async fn dispatch_stream(&self, request: Request, tx: mpsc::Sender<Frame>);
}

#[async_trait]
impl<C: Clock + 'static> RequestHandler for Daemon<C> {
    fn is_stopping(&self) -> bool {
        Daemon::is_stopping(self)
    }

    async fn dispatch(&self, request: Request) -> Response {
        self.touch_heartbeat();
        crate::dispatch::handle_one_shot(self, request).await
    }

    async fn dispatch_stream(&self, request: Request, tx: mpsc::Sender<Frame>) {
        self.touch_heartbeat();
        crate::listing::handle_stream(self, request, tx).await
    }
}
