// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration load and validation errors.

use pv_core::CronError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },

    #[error("invalid schedule '{schedule}': {source}")]
    Schedule { schedule: String, source: CronError },

    #[error("{0}")]
    Invalid(String),

    /// Fails the whole load, not just the workspace.
    #[error("circular dependency in jobs of '{scope}': {cycle}")]
    CircularDependency { scope: String, cycle: String },
}

impl ConfigError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConfigError::CircularDependency { .. })
    }
}
