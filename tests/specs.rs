// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios against an in-process daemon: a real `TicketStore`
//! on a `tempfile::TempDir`, a `MockArchiveClient`, and a real Unix socket.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dmfd_core::{Mode, ServerConfig, Status, SystemClock, Ticket, TicketKey};
use dmfd_daemon::archive::{ArchiveError, ListRecord, MockArchiveClient};
use dmfd_daemon::daemon::Daemon;
use dmfd_daemon::protocol::{read_frame, write_frame, Frame, ReturnCode};
use dmfd_daemon::storage::TicketStore;
use dmfd_daemon::{listener, scheduler};
use serial_test::serial;
use tokio::net::UnixStream;

fn fast_config() -> ServerConfig {
    ServerConfig { tick_interval_seconds: 0, ..ServerConfig::default() }
}

fn request(payload: serde_json::Value) -> Frame {
    Frame::new(ReturnCode::Ok, serde_json::to_vec(&payload).unwrap())
}

async fn one_shot(socket_path: &Path, payload: serde_json::Value) -> (ReturnCode, serde_json::Value) {
    let mut client = UnixStream::connect(socket_path).await.unwrap();
    write_frame(&mut client, &request(payload)).await.unwrap();
    let reply = read_frame(&mut client).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&reply.payload).unwrap_or_default();
    (reply.code, body)
}

async fn streaming(socket_path: &Path, payload: serde_json::Value) -> Vec<Frame> {
    let mut client = UnixStream::connect(socket_path).await.unwrap();
    write_frame(&mut client, &request(payload)).await.unwrap();
    let mut frames = Vec::new();
    loop {
        let frame = read_frame(&mut client).await.unwrap();
        let is_eof = frame.code == ReturnCode::Eof;
        frames.push(frame);
        if is_eof {
            break;
        }
    }
    frames
}

/// Poll `ticket_dir` for up to a few seconds, re-opening a fresh
/// `TicketStore` each time since the running daemon holds its own.
async fn wait_for_status(ticket_dir: &Path, key: &TicketKey, want: Status) -> Ticket {
    for _ in 0..200 {
        let store = TicketStore::open(ticket_dir).unwrap();
        if let Some(ticket) = store.get(key) {
            if ticket.status == want {
                return ticket.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("ticket never reached status {want:?}");
}

#[tokio::test]
#[serial]
async fn s1_register_then_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("d.sock");
    let store = TicketStore::open(dir.path().join("tickets")).unwrap();
    let daemon = Arc::new(Daemon::new(
        fast_config(),
        store,
        Arc::new(MockArchiveClient::new()),
        SystemClock,
    ));
    let raw_listener = listener::bind(&socket_path).unwrap();
    let running = {
        let daemon = daemon.clone();
        tokio::spawn(async move { listener::run(raw_listener, &*daemon).await })
    };

    let payload = serde_json::json!({"get": "/zone/home/alice/a.dat", "local_file": "/tmp/a.dat"});
    let (code, body) = one_shot(&socket_path, payload.clone()).await;
    assert_eq!(code, ReturnCode::Ok);
    assert_eq!(body["code"], 0);
    assert_eq!(body["msg"], "scheduled");
    assert_eq!(daemon.active_ticket_count(), 1);

    let (code, body) = one_shot(&socket_path, payload).await;
    assert_eq!(code, ReturnCode::Ok);
    assert_eq!(body["code"], 2);
    assert_eq!(daemon.active_ticket_count(), 1);

    running.abort();
}

#[tokio::test]
#[serial]
async fn s2_crash_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let ticket_dir = dir.path().join("tickets");
    std::fs::create_dir_all(&ticket_dir).unwrap();

    let mut in_flight = Ticket::new(Mode::Get, "/tmp/a.dat".into(), "/z/a.dat".to_string(), 1.0);
    in_flight.status = Status::Getting;
    in_flight.retries = 1;
    in_flight.transferred = 500_000;
    std::fs::write(ticket_dir.join("orphan.json"), in_flight.to_json().unwrap()).unwrap();

    let store = TicketStore::open(&ticket_dir).unwrap();
    let key = TicketKey::new("/tmp/a.dat", "/z/a.dat");
    let recovered = store.get(&key).unwrap();
    assert_eq!(recovered.status, Status::Retry);
    assert_eq!(recovered.retries, 3);
    assert_eq!(recovered.transferred, 0);

    let reopened = TicketStore::open(&ticket_dir).unwrap();
    let persisted = reopened.get(&key).unwrap();
    assert_eq!(persisted.status, Status::Retry);
}

#[tokio::test]
#[serial]
async fn s3_retry_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    let ticket_dir = dir.path().join("tickets");
    let mut store = TicketStore::open(&ticket_dir).unwrap();
    let mut ticket = Ticket::new(Mode::Get, "/tmp/a.dat".into(), "/z/a.dat".to_string(), 0.0);
    ticket.retries = 1;
    store.upsert(ticket).unwrap();

    let archive = MockArchiveClient::new();
    archive.queue_get("/z/a.dat", Err(ArchiveError::Transient("timeout".to_string())));
    archive.queue_get("/z/a.dat", Err(ArchiveError::Transient("timeout".to_string())));

    let daemon = Arc::new(Daemon::new(fast_config(), store, Arc::new(archive), SystemClock));
    let scheduler_task = tokio::spawn(scheduler::run(daemon.clone()));

    let key = TicketKey::new("/tmp/a.dat", "/z/a.dat");
    let ticket = wait_for_status(&ticket_dir, &key, Status::Error).await;
    assert!(!ticket.errmsg.is_empty());
    assert_eq!(daemon.active_ticket_count(), 0);

    scheduler_task.abort();
}

#[tokio::test]
#[serial]
async fn s4_unmig_does_not_consume_retries() {
    let dir = tempfile::tempdir().unwrap();
    let ticket_dir = dir.path().join("tickets");
    let mut store = TicketStore::open(&ticket_dir).unwrap();
    let ticket = Ticket::new(Mode::Get, "/tmp/a.dat".into(), "/z/a.dat".to_string(), 0.0);
    store.upsert(ticket).unwrap();

    let archive = MockArchiveClient::new();
    archive.queue_get("/z/a.dat", Err(ArchiveError::DmfMiss));

    let daemon = Arc::new(Daemon::new(fast_config(), store, Arc::new(archive), SystemClock));
    let scheduler_task = tokio::spawn(scheduler::run(daemon.clone()));

    let key = TicketKey::new("/tmp/a.dat", "/z/a.dat");
    let unmig = wait_for_status(&ticket_dir, &key, Status::Unmig).await;
    assert_eq!(unmig.retries, 3);

    let done = wait_for_status(&ticket_dir, &key, Status::Done).await;
    assert_eq!(done.retries, 3);

    scheduler_task.abort();
}

#[tokio::test]
#[serial]
async fn s5_streaming_list_with_limit() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("d.sock");
    let mut store = TicketStore::open(dir.path().join("tickets")).unwrap();
    store.upsert(Ticket::new(Mode::Get, "/tmp/a.dat".into(), "/z/a.dat".to_string(), 1.0)).unwrap();
    store.upsert(Ticket::new(Mode::Get, "/tmp/b.dat".into(), "/z/b.dat".to_string(), 2.0)).unwrap();

    let archive = MockArchiveClient::new().with_catalog(
        (0..5)
            .map(|i| ListRecord {
                collection: "/z".to_string(),
                object: format!("obj{i}.dat"),
                remote_file: format!("/z/obj{i}.dat"),
                remote_size: None,
                remote_checksum: None,
                remote_create_time: None,
                remote_modify_time: None,
                remote_owner_name: None,
                remote_owner_zone: None,
                remote_replica_number: None,
                remote_replica_status: None,
            })
            .collect(),
    );

    let daemon =
        Arc::new(Daemon::new(fast_config(), store, Arc::new(archive), SystemClock));
    let raw_listener = listener::bind(&socket_path).unwrap();
    let running = {
        let daemon = daemon.clone();
        tokio::spawn(async move { listener::run(raw_listener, &*daemon).await })
    };

    let frames = streaming(&socket_path, serde_json::json!({"list": true, "limit": 3})).await;
    assert_eq!(frames.len(), 4); // 3 OK + EOF
    assert_eq!(frames[3].code, ReturnCode::Eof);
    for frame in &frames[..3] {
        assert_eq!(frame.code, ReturnCode::Ok);
    }
    let remote_files: Vec<String> = frames[..3]
        .iter()
        .map(|f| {
            let v: serde_json::Value = serde_json::from_slice(&f.payload).unwrap();
            v["remote_file"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(remote_files[0], "/z/a.dat");
    assert_eq!(remote_files[1], "/z/b.dat");
    assert!(remote_files[2].starts_with("/z/obj"));

    running.abort();
}

#[tokio::test]
#[serial]
#[ignore = "exercises a real wall-clock idle timeout (just over 60s)"]
async fn s6_idle_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let store = TicketStore::open(dir.path().join("tickets")).unwrap();
    let config = ServerConfig { tick_interval_seconds: 1, stop_timeout_minutes: 1, ..ServerConfig::default() };
    let daemon = Arc::new(Daemon::new(config, store, Arc::new(MockArchiveClient::new()), SystemClock));
    let socket_path = dir.path().join("d.sock");
    let raw_listener = listener::bind(&socket_path).unwrap();

    let scheduler_task = tokio::spawn(scheduler::run(daemon.clone()));
    let listener_daemon = daemon.clone();
    tokio::select! {
        () = listener::run(raw_listener, &*listener_daemon) => {}
        () = daemon.shutdown.cancelled() => {}
    }

    assert!(daemon.shutdown.is_cancelled());
    scheduler_task.abort();
}
