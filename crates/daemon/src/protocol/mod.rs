// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for daemon communication.
//!
//! Wire format: 8-byte header (`u32` length, `u32` return code, both
//! big-endian) followed by `length` bytes of JSON payload.

pub mod frame;
pub mod request;
pub mod response;

pub use frame::{read_frame, write_frame, Frame, FrameError, ReturnCode};
pub use request::{ListFilter, Request, RequestError};
pub use response::{ErrorPayload, RegisterCode, RegisterResponse, Response};
