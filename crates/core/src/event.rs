// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events emitted by workspace operations.
//!
//! Events are fire-and-forget in-memory values: the deployment machine
//! produces them and the job engine consumes them synchronously. There is
//! no persistent queue; `Reboot` is synthesized once at daemon startup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a lifecycle event, doubling as the `@`-special schedule token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// A deploy finished successfully (`@deployment`).
    DeploymentCompleted,
    /// A deploy failed (`@deployment-failed`).
    DeploymentFailed,
    /// A destroy finished successfully (`@destroy`).
    DestroyCompleted,
    /// A destroy failed (`@destroy-failed`).
    DestroyFailed,
    /// Daemon startup (`@reboot`).
    Reboot,
}

impl EventKind {
    /// Parse the `@`-special spelling used in schedule fields.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "@deployment" => Some(Self::DeploymentCompleted),
            "@deployment-failed" => Some(Self::DeploymentFailed),
            "@destroy" => Some(Self::DestroyCompleted),
            "@destroy-failed" => Some(Self::DestroyFailed),
            "@reboot" => Some(Self::Reboot),
            _ => None,
        }
    }

    /// The `@`-special spelling.
    pub fn token(&self) -> &'static str {
        match self {
            Self::DeploymentCompleted => "@deployment",
            Self::DeploymentFailed => "@deployment-failed",
            Self::DestroyCompleted => "@destroy",
            Self::DestroyFailed => "@destroy-failed",
            Self::Reboot => "@reboot",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeploymentCompleted => write!(f, "deployment-completed"),
            Self::DeploymentFailed => write!(f, "deployment-failed"),
            Self::DestroyCompleted => write!(f, "destroy-completed"),
            Self::DestroyFailed => write!(f, "destroy-failed"),
            Self::Reboot => write!(f, "reboot"),
        }
    }
}

/// A lifecycle event: what happened, to which workspace, when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    /// Workspace name, or the standalone scope for `Reboot`.
    pub workspace: String,
    pub at: DateTime<Utc>,
    /// Deployment mode in effect, when the operation had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Error text for the failure kinds (ANSI-stripped).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, workspace: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { kind, workspace: workspace.into(), at, mode: None, error: None }
    }

    pub fn with_mode(mut self, mode: Option<String>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// One-line `key=value` summary for journal logging.
    pub fn log_summary(&self) -> String {
        let mut s = format!("event={} workspace={}", self.kind, self.workspace);
        if let Some(mode) = &self.mode {
            s.push_str(&format!(" mode={mode}"));
        }
        if let Some(error) = &self.error {
            s.push_str(&format!(" error={error}"));
        }
        s
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
