// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dmfd_core::{Mode, Ticket};
use yare::parameterized;

fn sample_ticket() -> Ticket {
    Ticket::new(Mode::Get, "/tmp/a.dat".into(), "/zone/home/alice/a.dat".to_string(), 0.0)
}

#[parameterized(
    ok = { RegisterCode::Ok, 0 },
    rescheduled = { RegisterCode::Rescheduled, 1 },
    already_registered = { RegisterCode::AlreadyRegistered, 2 },
    failed = { RegisterCode::Failed, 3 },
)]
fn register_code_serializes_to_its_integer(code: RegisterCode, expected: i32) {
    let json = serde_json::to_string(&code).unwrap();
    assert_eq!(json, expected.to_string());
    let parsed: RegisterCode = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, code);
}

#[test]
fn unknown_register_code_fails_to_deserialize() {
    let err = serde_json::from_str::<RegisterCode>("9").unwrap_err();
    assert!(err.to_string().contains("unknown register code"));
}

#[test]
fn scheduled_response_carries_ok_code_and_ticket() {
    let r = RegisterResponse::scheduled("/zone/home/alice/a.dat".to_string(), sample_ticket());
    assert_eq!(r.code, RegisterCode::Ok);
    assert_eq!(r.msg, "scheduled");
    assert!(r.ticket.is_some());
}

#[test]
fn already_registered_response_mentions_the_file() {
    let r = RegisterResponse::already_registered(
        "/zone/home/alice/a.dat".to_string(),
        sample_ticket(),
    );
    assert_eq!(r.code, RegisterCode::AlreadyRegistered);
    assert!(r.msg.contains("/zone/home/alice/a.dat"));
}

#[test]
fn failed_response_has_no_ticket() {
    let r = RegisterResponse::failed("/zone/home/alice/a.dat".to_string(), "boom".to_string());
    assert_eq!(r.code, RegisterCode::Failed);
    assert!(r.ticket.is_none());
    assert_eq!(r.msg, "boom");
}

#[test]
fn register_response_frame_uses_ok_return_code() {
    let r = RegisterResponse::scheduled("/a".to_string(), sample_ticket());
    let frame = Response::Register(r).to_frame();
    assert_eq!(frame.code, ReturnCode::Ok);
}

#[test]
fn error_response_frame_uses_error_return_code() {
    let frame = Response::Error(ErrorPayload::new("DmfError", "boom")).to_frame();
    assert_eq!(frame.code, ReturnCode::Error);
    let body: ErrorPayload = serde_json::from_slice(&frame.payload).unwrap();
    assert_eq!(body.exception, "DmfError");
    assert_eq!(body.msg, "boom");
}

#[test]
fn stopped_response_frame_uses_stopped_return_code() {
    let frame = Response::Stopped.to_frame();
    assert_eq!(frame.code, ReturnCode::Stopped);
}
