// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reply shapes for the one-shot request handlers.

use dmfd_core::Ticket;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::protocol::frame::{Frame, ReturnCode};

/// Per-registration outcome code, distinct from the frame-level
/// [`ReturnCode`] — this is carried inside the JSON body of an OK frame,
/// rendered on the wire as its plain integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RegisterCode {
    Ok = 0,
    Rescheduled = 1,
    AlreadyRegistered = 2,
    Failed = 3,
}

impl Serialize for RegisterCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(*self as i32)
    }
}

impl<'de> Deserialize<'de> for RegisterCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match i32::deserialize(deserializer)? {
            0 => Ok(RegisterCode::Ok),
            1 => Ok(RegisterCode::Rescheduled),
            2 => Ok(RegisterCode::AlreadyRegistered),
            3 => Ok(RegisterCode::Failed),
            other => Err(serde::de::Error::custom(format!("unknown register code {other}"))),
        }
    }
}

/// Reply to a `get`/`put` registration request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterResponse {
    pub file: String,
    pub ticket: Option<Ticket>,
    pub code: RegisterCode,
    pub msg: String,
}

impl RegisterResponse {
    pub fn scheduled(file: String, ticket: Ticket) -> RegisterResponse {
        RegisterResponse {
            file,
            ticket: Some(ticket),
            code: RegisterCode::Ok,
            msg: "scheduled".to_string(),
        }
    }

    pub fn rescheduled(file: String, ticket: Ticket) -> RegisterResponse {
        RegisterResponse {
            file,
            ticket: Some(ticket),
            code: RegisterCode::Rescheduled,
            msg: "rescheduled".to_string(),
        }
    }

    pub fn already_registered(file: String, ticket: Ticket) -> RegisterResponse {
        RegisterResponse {
            file: file.clone(),
            ticket: Some(ticket),
            code: RegisterCode::AlreadyRegistered,
            msg: format!("{file} already registered"),
        }
    }

    pub fn failed(file: String, msg: String) -> RegisterResponse {
        RegisterResponse { file, ticket: None, code: RegisterCode::Failed, msg }
    }
}

/// Error reply payload: sent with frame code `ERROR`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    pub exception: String,
    pub msg: String,
    #[serde(default)]
    pub traceback: String,
}

impl ErrorPayload {
    pub fn new(exception: impl Into<String>, msg: impl Into<String>) -> ErrorPayload {
        ErrorPayload { exception: exception.into(), msg: msg.into(), traceback: String::new() }
    }
}

/// A single, non-streaming reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Register(RegisterResponse),
    Info(serde_json::Value),
    Error(ErrorPayload),
    Stopped,
}

impl Response {
    pub fn to_frame(&self) -> Frame {
        match self {
            Response::Register(r) => {
                Frame::new(ReturnCode::Ok, serde_json::to_vec(r).unwrap_or_default())
            }
            Response::Info(v) => {
                Frame::new(ReturnCode::Ok, serde_json::to_vec(v).unwrap_or_default())
            }
            Response::Error(e) => {
                Frame::new(ReturnCode::Error, serde_json::to_vec(e).unwrap_or_default())
            }
            Response::Stopped => {
                Frame::new(ReturnCode::Stopped, b"server is stopping".to_vec())
            }
        }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
