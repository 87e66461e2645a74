// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SHA-256 checksumming of local files, base64-encoded to match the wire
//! and persisted `Ticket::checksum` representation.

use std::io::Read;
use std::path::Path;

use base64::Engine;
use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 64 * 1024;

/// Hash `path` in `CHUNK_SIZE` reads and return the base64-encoded digest.
pub fn sha256_base64(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(base64::engine::general_purpose::STANDARD.encode(hasher.finalize()))
}

/// The prefix the archive's remote checksum carries (`"sha2:" + base64`);
/// used by `checksum(ticket, remote_file)` to compare against the
/// locally-computed digest.
pub fn remote_checksum_matches(local_base64: &str, remote: &str) -> bool {
    remote == format!("sha2:{local_base64}")
}

#[cfg(test)]
#[path = "checksum_tests.rs"]
mod tests;
