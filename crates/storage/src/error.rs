// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State store errors.

use pv_core::WorkspaceStatus;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The state file exists but cannot be parsed; startup must fail rather
    /// than silently start from scratch.
    #[error("unreadable state file {path}: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },

    #[error("workspace '{workspace}' is busy ({status})")]
    Busy { workspace: String, status: WorkspaceStatus },

    #[error("workspace '{workspace}': invalid transition {from} -> {to}")]
    InvalidTransition {
        workspace: String,
        from: WorkspaceStatus,
        to: WorkspaceStatus,
    },
}
