// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::archive::MockArchiveClient;
use crate::test_support::test_daemon_with_archive;
use dmfd_core::{Mode, Ticket};

fn archive_record(remote_file: &str) -> ListRecord {
    ListRecord {
        collection: std::path::Path::new(remote_file)
            .parent()
            .unwrap()
            .to_string_lossy()
            .into_owned(),
        object: std::path::Path::new(remote_file).file_name().unwrap().to_string_lossy().into_owned(),
        remote_file: remote_file.to_string(),
        remote_size: Some(10),
        remote_checksum: None,
        remote_create_time: None,
        remote_modify_time: None,
        remote_owner_name: None,
        remote_owner_zone: None,
        remote_replica_number: None,
        remote_replica_status: None,
    }
}

#[tokio::test]
async fn list_emits_ticket_records_before_archive_records() {
    let dir = tempfile::tempdir().unwrap();
    let archive = MockArchiveClient::new().with_catalog(vec![
        archive_record("/z/home/alice/b.dat"),
        archive_record("/z/home/alice/c.dat"),
    ]);
    let daemon = test_daemon_with_archive(dir.path(), archive);
    daemon
        .store
        .lock()
        .upsert(Ticket::new(Mode::Get, "/tmp/a.dat".into(), "/z/home/alice/a.dat".to_string(), 1.0))
        .unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    handle_stream(&daemon, Request::List { limit: Some(3), filter: ListFilter::default() }, tx).await;

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2].code, ReturnCode::Eof);
    let first: serde_json::Value = serde_json::from_slice(&frames[0].payload).unwrap();
    assert_eq!(first["remote_file"], "/z/home/alice/a.dat");
}

#[tokio::test]
async fn active_filter_excludes_terminal_tickets() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = test_daemon_with_archive(dir.path(), MockArchiveClient::new());
    let mut done = Ticket::new(Mode::Get, "/tmp/a.dat".into(), "/z/a.dat".to_string(), 1.0);
    done.status = dmfd_core::Status::Done;
    daemon.store.lock().upsert(done).unwrap();
    daemon
        .store
        .lock()
        .upsert(Ticket::new(Mode::Get, "/tmp/b.dat".into(), "/z/b.dat".to_string(), 2.0))
        .unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    handle_stream(
        &daemon,
        Request::List { limit: None, filter: ListFilter { active: true } },
        tx,
    )
    .await;

    let mut items = Vec::new();
    while let Some(frame) = rx.recv().await {
        if frame.code == ReturnCode::Ok {
            items.push(frame);
        }
    }
    assert_eq!(items.len(), 1);
    let item: serde_json::Value = serde_json::from_slice(&items[0].payload).unwrap();
    assert_eq!(item["remote_file"], "/z/b.dat");
}

#[tokio::test]
async fn missing_local_file_is_marked_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = test_daemon_with_archive(dir.path(), MockArchiveClient::new());
    daemon
        .store
        .lock()
        .upsert(Ticket::new(Mode::Put, "/tmp/gone.dat".into(), "/z/gone.dat".to_string(), 1.0))
        .unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    handle_stream(&daemon, Request::List { limit: None, filter: ListFilter::default() }, tx).await;

    let frame = rx.recv().await.unwrap();
    let item: serde_json::Value = serde_json::from_slice(&frame.payload).unwrap();
    assert_eq!(item["local_file"], "DELETED:/tmp/gone.dat");
}

#[tokio::test]
async fn info_returns_empty_object_for_unknown_path() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = test_daemon_with_archive(dir.path(), MockArchiveClient::new());
    let response = info(&daemon, "/z/nope.dat").await;
    assert_eq!(response, Response::Info(serde_json::json!({})));
}

#[tokio::test]
async fn info_finds_an_archive_only_object() {
    let dir = tempfile::tempdir().unwrap();
    let archive = MockArchiveClient::new().with_catalog(vec![archive_record("/z/home/alice/a.dat")]);
    let daemon = test_daemon_with_archive(dir.path(), archive);
    let response = info(&daemon, "/z/home/alice/a.dat").await;
    match response {
        Response::Info(v) => assert_eq!(v["remote_file"], "/z/home/alice/a.dat"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn completion_list_filters_by_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let archive = MockArchiveClient::new()
        .with_catalog(vec![archive_record("/z/home/alice/a.dat"), archive_record("/z/home/bob/b.dat")]);
    let daemon = test_daemon_with_archive(dir.path(), archive);

    let (tx, mut rx) = mpsc::channel(16);
    handle_stream(&daemon, Request::CompletionList { prefix: "/z/home/alice".to_string() }, tx).await;

    let mut paths = Vec::new();
    while let Some(frame) = rx.recv().await {
        if frame.code == ReturnCode::Ok {
            paths.push(String::from_utf8(frame.payload).unwrap());
        }
    }
    assert_eq!(paths, vec!["/z/home/alice/a.dat".to_string()]);
}

#[tokio::test]
async fn no_records_emits_only_eof() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = test_daemon_with_archive(dir.path(), MockArchiveClient::new());
    let (tx, mut rx) = mpsc::channel(16);
    handle_stream(&daemon, Request::List { limit: None, filter: ListFilter::default() }, tx).await;
    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.code, ReturnCode::Eof);
    assert!(rx.recv().await.is_none());
}
