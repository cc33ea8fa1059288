// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler state store: one durable record per workspace.
//!
//! Only the transitions in the permitted table ever fire; anything else is
//! an `InvalidTransition`. Failure statuses are sticky; the compensating
//! transition in [`StateStore::config_changed`] is the only way out short
//! of a successful manual operation.

use crate::atomic;
use crate::error::StateError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pv_core::WorkspaceStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Durable per-workspace record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    #[serde(default)]
    pub status: WorkspaceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deployed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_destroyed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deploy_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_destroy_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_config_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_mode: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SchedulerState {
    #[serde(default)]
    workspaces: BTreeMap<String, WorkspaceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
}

/// Process-global workspace state, serialized under one lock.
pub struct StateStore {
    path: PathBuf,
    inner: Mutex<SchedulerState>,
}

impl StateStore {
    /// Load from disk. Missing file yields an empty store; an unreadable
    /// file is a startup error.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let inner = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StateError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SchedulerState::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path: path.to_path_buf(), inner: Mutex::new(inner) })
    }

    /// Persist atomically, stamping `last_updated`.
    pub fn save(&self, now: DateTime<Utc>) -> Result<(), StateError> {
        let mut state = self.inner.lock();
        state.last_updated = Some(now);
        atomic::write_json(&self.path, &*state)?;
        Ok(())
    }

    /// Snapshot one workspace's record (default: fresh `Destroyed`).
    pub fn workspace(&self, name: &str) -> WorkspaceState {
        self.inner.lock().workspaces.get(name).cloned().unwrap_or_default()
    }

    /// Snapshot every record, including those for unknown workspaces.
    pub fn all(&self) -> BTreeMap<String, WorkspaceState> {
        self.inner.lock().workspaces.clone()
    }

    /// Check-and-set the deploy busy status.
    ///
    /// Atomic under the store lock: of two concurrent triggers exactly one
    /// wins, the other observes `Busy`.
    pub fn begin_deploy(&self, name: &str) -> Result<(), StateError> {
        self.begin(name, WorkspaceStatus::Deploying)
    }

    /// Check-and-set the destroy busy status.
    pub fn begin_destroy(&self, name: &str) -> Result<(), StateError> {
        self.begin(name, WorkspaceStatus::Destroying)
    }

    fn begin(&self, name: &str, busy: WorkspaceStatus) -> Result<(), StateError> {
        let mut state = self.inner.lock();
        let record = state.workspaces.entry(name.to_string()).or_default();
        if record.status.is_busy() {
            return Err(StateError::Busy { workspace: name.to_string(), status: record.status });
        }
        record.status = busy;
        Ok(())
    }

    /// Deploy success: `deploying -> deployed`.
    pub fn complete_deploy(
        &self,
        name: &str,
        mode: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StateError> {
        let mut state = self.inner.lock();
        let record = expect_status(&mut state, name, WorkspaceStatus::Deploying, WorkspaceStatus::Deployed)?;
        record.status = WorkspaceStatus::Deployed;
        record.last_deployed = Some(at);
        record.last_deploy_error = None;
        record.deployment_mode = mode;
        Ok(())
    }

    /// Deploy failure: `deploying -> deploy_failed` (sticky).
    pub fn fail_deploy(
        &self,
        name: &str,
        error: impl Into<String>,
    ) -> Result<(), StateError> {
        let mut state = self.inner.lock();
        let record =
            expect_status(&mut state, name, WorkspaceStatus::Deploying, WorkspaceStatus::DeployFailed)?;
        record.status = WorkspaceStatus::DeployFailed;
        record.last_deploy_error = Some(error.into());
        Ok(())
    }

    /// Destroy success: `destroying -> destroyed`.
    pub fn complete_destroy(&self, name: &str, at: DateTime<Utc>) -> Result<(), StateError> {
        let mut state = self.inner.lock();
        let record =
            expect_status(&mut state, name, WorkspaceStatus::Destroying, WorkspaceStatus::Destroyed)?;
        record.status = WorkspaceStatus::Destroyed;
        record.last_destroyed = Some(at);
        record.last_destroy_error = None;
        record.deployment_mode = None;
        Ok(())
    }

    /// Destroy failure: `destroying -> destroy_failed` (sticky).
    pub fn fail_destroy(
        &self,
        name: &str,
        error: impl Into<String>,
    ) -> Result<(), StateError> {
        let mut state = self.inner.lock();
        let record =
            expect_status(&mut state, name, WorkspaceStatus::Destroying, WorkspaceStatus::DestroyFailed)?;
        record.status = WorkspaceStatus::DestroyFailed;
        record.last_destroy_error = Some(error.into());
        Ok(())
    }

    /// Record a configuration change and apply the compensating transition.
    ///
    /// Releases sticky failures and forces a redeploy of deployed
    /// workspaces; `destroyed` and busy statuses are unaffected. Runs under
    /// the same lock as the busy check-and-set, so a concurrent manual
    /// operation can never interleave.
    pub fn config_changed(&self, name: &str, mtime: DateTime<Utc>) {
        let mut state = self.inner.lock();
        let record = state.workspaces.entry(name.to_string()).or_default();
        record.last_config_modified = Some(mtime);
        match record.status {
            WorkspaceStatus::DeployFailed => {
                record.status = WorkspaceStatus::Destroyed;
                record.last_deploy_error = None;
            }
            WorkspaceStatus::DestroyFailed => {
                record.status = WorkspaceStatus::Deployed;
                record.last_destroy_error = None;
            }
            WorkspaceStatus::Deployed => {
                record.status = WorkspaceStatus::Destroyed;
                record.last_deployed = None;
            }
            _ => {}
        }
    }
}

fn expect_status<'a>(
    state: &'a mut SchedulerState,
    name: &str,
    expected: WorkspaceStatus,
    to: WorkspaceStatus,
) -> Result<&'a mut WorkspaceState, StateError> {
    let record = state.workspaces.entry(name.to_string()).or_default();
    if record.status != expected {
        return Err(StateError::InvalidTransition {
            workspace: name.to_string(),
            from: record.status,
            to,
        });
    }
    Ok(record)
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
