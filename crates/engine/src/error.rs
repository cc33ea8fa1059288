// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level errors surfaced by manual operations.
//!
//! Scheduled (background) operations absorb these into state and logs;
//! only the operations surface returns them to a caller.

use crate::templates::TemplateError;
use pv_config::ConfigError;
use pv_storage::StateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown workspace '{0}'")]
    UnknownWorkspace(String),

    #[error("workspace '{0}' is disabled")]
    Disabled(String),

    /// Busy and transition violations from the store.
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("workspace '{0}' has no local source and no template")]
    NoSource(String),

    #[error("workspace '{0}' is mode-based; a mode is required")]
    ModeRequired(String),

    #[error("workspace '{name}' has no mode '{mode}'")]
    UnknownMode { name: String, mode: String },

    #[error("mode switch declined")]
    ModeSwitchDeclined,

    #[error("deploy failed: {0}")]
    DeployFailed(String),

    #[error("destroy failed: {0}")]
    DestroyFailed(String),

    #[error("unknown job '{0}'")]
    UnknownJob(String),

    #[error("job '{0}' is already running")]
    JobRunning(String),

    #[error("job '{0}' is not running")]
    JobNotRunning(String),

    #[error("job '{key}' failed: {error}")]
    JobFailed { key: String, error: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
