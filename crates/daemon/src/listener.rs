// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener: one dedicated task, serialized connection handling
//! — no per-connection `tokio::spawn`. Generic over [`RequestHandler`] so
//! the socket-facing plumbing never touches a ticket or the archive
//! directly.

use std::path::Path;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::daemon::RequestHandler;
use crate::protocol::frame::ReturnCode;
use crate::protocol::{read_frame, write_frame, ErrorPayload, Frame, FrameError, Request};

const STREAM_CHANNEL_CAPACITY: usize = 16;

/// Bind the socket at `path`, removing any stale file left by a crashed
/// run first.
pub fn bind(path: &Path) -> std::io::Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    UnixListener::bind(path)
}

/// Accept connections until cancelled. The caller races this future against
/// the daemon's shutdown signal (`accept()` has no clean-shutdown hook of
/// its own) and drops it once that signal fires.
pub async fn run<H: RequestHandler>(listener: UnixListener, handler: &H) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                if let Err(e) = handle_connection(stream, handler).await {
                    warn!(error = %e, "connection handling failed");
                }
            }
            Err(e) => warn!(error = %e, "accept failed"),
        }
    }
}

/// One request/response cycle: a single frame in, one or more frames out,
/// then close. Handler exceptions are surfaced as an `ERROR` frame rather
/// than propagated — a broken handler never brings the listener down.
async fn handle_connection<H: RequestHandler>(
    mut stream: UnixStream,
    handler: &H,
) -> Result<(), FrameError> {
    let request_frame = read_frame(&mut stream).await?;

    if handler.is_stopping() {
        let frame = Frame::new(ReturnCode::Stopped, b"server is stopping".to_vec());
        write_frame(&mut stream, &frame).await?;
        return Ok(());
    }

    let request = match Request::from_json(&request_frame.payload) {
        Ok(request) => request,
        Err(e) => {
            let payload = ErrorPayload::new("RequestError", e.to_string());
            let frame = Frame::new(ReturnCode::Error, serde_json::to_vec(&payload).unwrap_or_default());
            write_frame(&mut stream, &frame).await?;
            return Ok(());
        }
    };

    if is_streaming(&request) {
        let (tx, mut rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let produce = handler.dispatch_stream(request, tx);
        let drain = async {
            while let Some(frame) = rx.recv().await {
                write_frame(&mut stream, &frame).await?;
            }
            Ok::<(), FrameError>(())
        };
        let (_, drained) = tokio::join!(produce, drain);
        drained?;
    } else {
        let response = handler.dispatch(request).await;
        write_frame(&mut stream, &response.to_frame()).await?;
    }

    debug!("connection handled");
    Ok(())
}

fn is_streaming(request: &Request) -> bool {
    matches!(request, Request::List { .. } | Request::CompletionList { .. })
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
