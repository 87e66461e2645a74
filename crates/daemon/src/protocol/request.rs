// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoding of client request payloads: dispatch is keyed on the
//! first recognized top-level JSON field.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ListFilter {
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Get { remote_file: String, local_file: PathBuf },
    Put { local_file: PathBuf, remote_file: String },
    Info { remote_file: String },
    List { limit: Option<usize>, filter: ListFilter },
    CompletionList { prefix: String },
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("request has no recognized top-level key")]
    Unrecognized,
    #[error("'get' requires 'local_file'")]
    GetMissingLocalFile,
    #[error("'put' requires 'remote_file'")]
    PutMissingRemoteFile,
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    get: Option<String>,
    put: Option<PathBuf>,
    info: Option<String>,
    list: Option<bool>,
    completion_list: Option<String>,
    local_file: Option<PathBuf>,
    remote_file: Option<String>,
    limit: Option<usize>,
    #[serde(default)]
    filter: ListFilter,
}

impl Request {
    /// Parse one request payload, routing on the first recognized top-level
    /// key: `get`, `put`, `info`, `list`, `completion_list`.
    pub fn from_json(bytes: &[u8]) -> Result<Request, RequestError> {
        let raw: RawRequest = serde_json::from_slice(bytes)?;

        if let Some(remote_file) = raw.get {
            let local_file = raw.local_file.ok_or(RequestError::GetMissingLocalFile)?;
            return Ok(Request::Get { remote_file, local_file });
        }
        if let Some(local_file) = raw.put {
            let remote_file = raw.remote_file.ok_or(RequestError::PutMissingRemoteFile)?;
            return Ok(Request::Put { local_file, remote_file });
        }
        if let Some(remote_file) = raw.info {
            return Ok(Request::Info { remote_file });
        }
        if raw.list.unwrap_or(false) {
            return Ok(Request::List { limit: raw.limit, filter: raw.filter });
        }
        if let Some(prefix) = raw.completion_list {
            return Ok(Request::CompletionList { prefix });
        }
        Err(RequestError::Unrecognized)
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
