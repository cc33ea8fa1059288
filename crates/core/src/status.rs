// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace and job lifecycle statuses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a managed workspace.
///
/// `Deploying`/`Destroying` are the busy statuses: a workspace holding one
/// is not eligible for any further automatic or manual operation until the
/// in-flight operation completes. `DeployFailed`/`DestroyFailed` are sticky:
/// only a configuration change releases them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    /// Known but never acted on.
    Pending,
    /// Not deployed (the initial status).
    #[default]
    Destroyed,
    /// Deploy in flight.
    Deploying,
    /// Deployed and standing.
    Deployed,
    /// Destroy in flight.
    Destroying,
    /// Last deploy failed; retry suspended until config changes.
    DeployFailed,
    /// Last destroy failed; retry suspended until config changes.
    DestroyFailed,
}

impl WorkspaceStatus {
    /// Whether an operation is currently in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Deploying | Self::Destroying)
    }
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Destroyed => "destroyed",
            Self::Deploying => "deploying",
            Self::Deployed => "deployed",
            Self::Destroying => "destroying",
            Self::DeployFailed => "deploy_failed",
            Self::DestroyFailed => "destroy_failed",
        };
        write!(f, "{}", s)
    }
}

/// Status of a job run record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Timeout,
    Disabled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Disabled => "disabled",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
