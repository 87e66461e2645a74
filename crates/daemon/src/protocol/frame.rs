// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire framing: an 8-byte header (`u32` length, big-endian, then `u32`
//! return code, big-endian) followed by `length` bytes of payload.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown return code {0}")]
    UnknownCode(u32),
}

/// The status carried by a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Ok = 0,
    Error = 1,
    Undefined = 2,
    Stopped = 3,
    Yield = 4,
    Eof = 5,
}

impl ReturnCode {
    fn from_u32(v: u32) -> Result<ReturnCode, FrameError> {
        match v {
            0 => Ok(ReturnCode::Ok),
            1 => Ok(ReturnCode::Error),
            2 => Ok(ReturnCode::Undefined),
            3 => Ok(ReturnCode::Stopped),
            4 => Ok(ReturnCode::Yield),
            5 => Ok(ReturnCode::Eof),
            other => Err(FrameError::UnknownCode(other)),
        }
    }
}

/// One decoded frame: a return code plus its payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub code: ReturnCode,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(code: ReturnCode, payload: impl Into<Vec<u8>>) -> Frame {
        Frame { code, payload: payload.into() }
    }

    pub fn eof() -> Frame {
        Frame::new(ReturnCode::Eof, b"EOF".to_vec())
    }
}

/// Write one frame: header then payload.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), FrameError> {
    let len = frame.payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&(frame.code as u32).to_be_bytes()).await?;
    writer.write_all(&frame.payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame, blocking until the full header and payload arrive or the
/// peer closes the connection.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, FrameError> {
    let mut header = [0u8; 8];
    reader.read_exact(&mut header).await?;
    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let code = ReturnCode::from_u32(u32::from_be_bytes([header[4], header[5], header[6], header[7]]))?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Frame { code, payload })
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
