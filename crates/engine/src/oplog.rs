// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workspace operation logs.
//!
//! Append-only files under the log root, one per workspace, carrying the
//! full color-preserved tool output. Appends are serialized by the busy
//! status upstream; failures here are logged and swallowed so a full log
//! disk never turns a deploy into a failure.

use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Append a timestamped operation block to a workspace log.
pub fn append(path: &Path, at: DateTime<Utc>, heading: &str, body: &str) {
    if let Err(e) = try_append(path, at, heading, body) {
        warn!(path = %path.display(), error = %e, "failed to append workspace log");
    }
}

fn try_append(
    path: &Path,
    at: DateTime<Utc>,
    heading: &str,
    body: &str,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "=== {} {} ===", at.to_rfc3339(), heading)?;
    writeln!(file, "{}", body.trim_end())?;
    Ok(())
}
