// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The synchronous operations surface the external CLIs call.
//!
//! Every operation loads the registries fresh, runs against the shared
//! engine, and both records and returns its errors, unlike scheduled
//! operations, which absorb them.

use crate::engine::Engine;
use crate::error::EngineError;
use crate::jobs::JobOutcome;
use pv_adapters::ProbedStatus;
use pv_config::{JobDef, Workspace, WorkspaceRegistry};
use pv_core::{scoped_name, Clock, WorkspaceStatus};
use pv_storage::{JobState, WorkspaceState};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Result of `status` for one workspace.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub name: String,
    pub state: WorkspaceState,
    /// Ground truth from the tool's state artifacts, present only when it
    /// disagrees with the managed record.
    pub probed: Option<ProbedStatus>,
    /// Artifact mtime, a fallback timestamp when the record has none.
    pub artifact_mtime: Option<DateTime<Utc>>,
}

/// One row of `list`.
#[derive(Debug, Clone)]
pub struct WorkspaceListing {
    pub name: String,
    pub enabled: bool,
    pub status: WorkspaceStatus,
    pub schedule: String,
    pub description: Option<String>,
}

pub struct Operations<K: Clock> {
    engine: Arc<Engine<K>>,
}

impl<K: Clock> Operations<K> {
    pub fn new(engine: Arc<Engine<K>>) -> Self {
        Self { engine }
    }

    fn load_registry(&self) -> Result<WorkspaceRegistry, EngineError> {
        Ok(WorkspaceRegistry::load(&self.engine.roots)?)
    }

    fn require_workspace(
        registry: &WorkspaceRegistry,
        name: &str,
    ) -> Result<Workspace, EngineError> {
        registry.get(name).cloned().ok_or_else(|| EngineError::UnknownWorkspace(name.to_string()))
    }

    /// Manual deploy, bypassing the schedule. Refuses disabled or busy
    /// workspaces; mode-based workspaces need a mode unless exactly one is
    /// configured.
    pub async fn deploy(&self, name: &str, mode: Option<&str>) -> Result<(), EngineError> {
        let registry = self.load_registry()?;
        let ws = Self::require_workspace(&registry, name)?;
        if !ws.enabled {
            return Err(EngineError::Disabled(name.to_string()));
        }
        let mode = resolve_mode(&ws, mode)?;
        self.engine.jobs.replace_defs(registry.all_jobs().into_iter().cloned().collect());
        let result = self.engine.deployer.deploy(&ws, mode.as_deref()).await;
        self.engine.persist();
        result
    }

    /// Mode switch: deploy in `mode`, asking `confirm(current, requested)`
    /// first when the workspace is already deployed in a different mode.
    pub async fn mode(
        &self,
        name: &str,
        mode: &str,
        confirm: impl FnOnce(&str, &str) -> bool,
    ) -> Result<(), EngineError> {
        let registry = self.load_registry()?;
        let ws = Self::require_workspace(&registry, name)?;
        if !ws.enabled {
            return Err(EngineError::Disabled(name.to_string()));
        }
        if ws.is_mode_based() && !ws.mode_schedules.contains_key(mode) {
            return Err(EngineError::UnknownMode {
                name: name.to_string(),
                mode: mode.to_string(),
            });
        }
        let record = self.engine.store.workspace(name);
        if record.status == WorkspaceStatus::Deployed
            && record.deployment_mode.as_deref() != Some(mode)
        {
            let current = record.deployment_mode.as_deref().unwrap_or("(none)");
            if !confirm(current, mode) {
                return Err(EngineError::ModeSwitchDeclined);
            }
        }
        self.engine.jobs.replace_defs(registry.all_jobs().into_iter().cloned().collect());
        let result = self.engine.deployer.deploy(&ws, Some(mode)).await;
        self.engine.persist();
        result
    }

    /// Manual destroy, bypassing the schedule.
    pub async fn destroy(&self, name: &str) -> Result<(), EngineError> {
        let registry = self.load_registry()?;
        let ws = Self::require_workspace(&registry, name)?;
        if !ws.enabled {
            return Err(EngineError::Disabled(name.to_string()));
        }
        self.engine.jobs.replace_defs(registry.all_jobs().into_iter().cloned().collect());
        let result = self.engine.deployer.destroy(name).await;
        self.engine.persist();
        result
    }

    /// Managed state plus ground truth where the two disagree.
    pub fn status(&self, name: &str) -> Result<StatusReport, EngineError> {
        let registry = self.load_registry()?;
        let known_in_config = registry.get(name).is_some();
        let state = self.engine.store.workspace(name);
        if !known_in_config && self.engine.store.all().get(name).is_none() {
            return Err(EngineError::UnknownWorkspace(name.to_string()));
        }

        let dir = self.engine.roots.deployment_dir(name);
        let probed = self.engine.client.probe_status(&dir);
        let disagrees = match state.status {
            WorkspaceStatus::Deployed => probed != ProbedStatus::Deployed,
            WorkspaceStatus::Destroyed | WorkspaceStatus::Pending => {
                probed == ProbedStatus::Deployed
            }
            _ => false,
        };
        Ok(StatusReport {
            name: name.to_string(),
            state,
            probed: disagrees.then_some(probed),
            artifact_mtime: self.engine.client.last_state_change(&dir),
        })
    }

    /// Enumerate configured workspaces with schedules and statuses.
    pub fn list(&self) -> Result<Vec<WorkspaceListing>, EngineError> {
        let registry = self.load_registry()?;
        Ok(registry
            .workspaces
            .values()
            .map(|ws| WorkspaceListing {
                name: ws.name.clone(),
                enabled: ws.enabled,
                status: self.engine.store.workspace(&ws.name).status,
                schedule: ws.schedule_summary(),
                description: ws.description.clone(),
            })
            .collect())
    }

    /// Contents of the workspace's operation log; empty when none yet.
    pub fn logs(&self, name: &str) -> Result<String, EngineError> {
        match std::fs::read_to_string(self.engine.roots.workspace_log(name)) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    // ── Jobs ───────────────────────────────────────────────────────────

    fn find_job(&self, scope: &str, name: &str) -> Result<JobDef, EngineError> {
        let registry = self.load_registry()?;
        registry
            .jobs_in_scope(scope)
            .into_iter()
            .find(|j| j.name == name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownJob(scoped_name(scope, name)))
    }

    /// Run a job synchronously; a non-success outcome is an error.
    pub async fn job_run(&self, scope: &str, name: &str) -> Result<(), EngineError> {
        let def = self.find_job(scope, name)?;
        let key = def.key();
        let outcome = self.engine.jobs.run_now(&def).await?;
        self.engine.persist();
        match outcome {
            JobOutcome::Success => Ok(()),
            JobOutcome::Skipped => Err(EngineError::JobFailed {
                key,
                error: "job is disabled".to_string(),
            }),
            JobOutcome::Timeout => {
                Err(EngineError::JobFailed { key, error: "timed out".to_string() })
            }
            JobOutcome::Failed(error) => Err(EngineError::JobFailed { key, error }),
        }
    }

    pub fn job_kill(&self, scope: &str, name: &str) -> Result<(), EngineError> {
        self.engine.jobs.kill(&scoped_name(scope, name))
    }

    /// Job state records for one scope, or a single job.
    pub fn job_status(
        &self,
        scope: &str,
        name: Option<&str>,
    ) -> Result<Vec<(String, JobState)>, EngineError> {
        if let Some(name) = name {
            let def = self.find_job(scope, name)?;
            let key = def.key();
            let state = self.engine.job_states.get(&key);
            return Ok(vec![(key, state)]);
        }
        let registry = self.load_registry()?;
        Ok(registry
            .jobs_in_scope(scope)
            .into_iter()
            .map(|def| {
                let key = def.key();
                let state = self.engine.job_states.get(&key);
                (key, state)
            })
            .collect())
    }

    pub fn job_list(&self, scope: &str) -> Result<Vec<JobDef>, EngineError> {
        let registry = self.load_registry()?;
        Ok(registry.jobs_in_scope(scope).into_iter().cloned().collect())
    }
}

/// Mode resolution for manual deploys.
fn resolve_mode(ws: &Workspace, mode: Option<&str>) -> Result<Option<String>, EngineError> {
    if !ws.is_mode_based() {
        return Ok(mode.map(str::to_string));
    }
    match mode {
        Some(m) if ws.mode_schedules.contains_key(m) => Ok(Some(m.to_string())),
        Some(m) => {
            Err(EngineError::UnknownMode { name: ws.name.clone(), mode: m.to_string() })
        }
        // A single configured mode is unambiguous.
        None if ws.mode_schedules.len() == 1 => {
            Ok(ws.mode_schedules.keys().next().cloned())
        }
        None => Err(EngineError::ModeRequired(ws.name.clone())),
    }
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
