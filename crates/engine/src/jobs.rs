// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job engine: time- and event-triggered execution with dependency
//! ordering, timeouts, and cancellation.
//!
//! Jobs run in their own process group so a timeout or kill reaches the
//! whole tree. Event triggers run a scope's selected jobs as one chain in
//! topological order; a failed or timed-out predecessor skips every
//! transitive dependent for that trigger instance only.

mod exec;

use crate::error::EngineError;
use crate::templates::TemplateRegistry;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use pv_adapters::{copy_tree, DeployRequest, ProvisionerClient};
use pv_config::{topo_order, JobDef, JobKind, Roots};
use pv_core::{Clock, LifecycleEvent, EventKind, STANDALONE_SCOPE};
use pv_storage::JobStateStore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Outcome of one job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed(String),
    Timeout,
    /// Not run: a predecessor in the trigger chain did not succeed.
    Skipped,
}

struct RunningInfo {
    pid: i32,
    killed: bool,
}

pub struct JobEngine<K: Clock> {
    defs: Mutex<HashMap<String, JobDef>>,
    states: Arc<JobStateStore>,
    running: Arc<Mutex<HashMap<String, RunningInfo>>>,
    client: Arc<dyn ProvisionerClient>,
    templates: Arc<TemplateRegistry>,
    roots: Roots,
    clock: K,
}

impl<K: Clock> JobEngine<K> {
    pub fn new(
        states: Arc<JobStateStore>,
        client: Arc<dyn ProvisionerClient>,
        templates: Arc<TemplateRegistry>,
        roots: Roots,
        clock: K,
    ) -> Self {
        Self {
            defs: Mutex::new(HashMap::new()),
            states,
            running: Arc::new(Mutex::new(HashMap::new())),
            client,
            templates,
            roots,
            clock,
        }
    }

    /// Swap in the registry's current job definitions (load and hot reload).
    pub fn replace_defs(&self, defs: Vec<JobDef>) {
        let mut map = HashMap::with_capacity(defs.len());
        for def in defs {
            map.insert(def.key(), def);
        }
        *self.defs.lock() = map;
    }

    pub fn get_def(&self, key: &str) -> Option<JobDef> {
        self.defs.lock().get(key).cloned()
    }

    pub fn defs_in_scope(&self, scope: &str) -> Vec<JobDef> {
        let mut defs: Vec<JobDef> =
            self.defs.lock().values().filter(|d| d.scope == scope).cloned().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Time trigger: dispatch every enabled job whose cron matches `now`.
    ///
    /// A job already running is not dispatched again.
    pub fn tick(self: &Arc<Self>, now: DateTime<Local>) -> Vec<JoinHandle<()>> {
        let due: Vec<JobDef> = {
            let defs = self.defs.lock();
            defs.values().filter(|d| d.enabled && d.matches_minute(now)).cloned().collect()
        };
        let mut handles = Vec::new();
        for def in due {
            let engine = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                let _ = engine.execute_tracked(&def).await;
            }));
        }

        // Refresh next-fire timestamps for status reporting.
        for def in self.defs.lock().values().filter(|d| d.enabled) {
            let next = def
                .schedules
                .iter()
                .filter_map(|s| s.next_after(now))
                .min()
                .map(|t| t.with_timezone(&chrono::Utc));
            self.states.set_next_run(&def.key(), next);
        }
        handles
    }

    /// Event trigger: run the scope's matching jobs as an ordered chain.
    ///
    /// Scope selection: the event's workspace, or the standalone scope for
    /// `@reboot`.
    pub fn handle_event(self: &Arc<Self>, event: &LifecycleEvent) -> Option<JoinHandle<()>> {
        let scope = if event.kind == EventKind::Reboot {
            STANDALONE_SCOPE
        } else {
            event.workspace.as_str()
        };
        let selected: Vec<JobDef> = {
            let defs = self.defs.lock();
            defs.values()
                .filter(|d| d.scope == scope && d.enabled && d.triggered_by(event.kind))
                .cloned()
                .collect()
        };
        if selected.is_empty() {
            return None;
        }
        info!(
            scope = %scope,
            count = selected.len(),
            "dispatching jobs for {}",
            event.log_summary()
        );
        let engine = Arc::clone(self);
        Some(tokio::spawn(async move {
            engine.run_chain(selected).await;
        }))
    }

    /// Run one trigger instance's jobs in dependency order.
    async fn run_chain(self: Arc<Self>, selected: Vec<JobDef>) {
        let refs: Vec<&JobDef> = selected.iter().collect();
        let order: Vec<JobDef> = topo_order(&refs).into_iter().cloned().collect();
        let selected_names: HashSet<String> = order.iter().map(|d| d.name.clone()).collect();

        let mut succeeded: HashSet<String> = HashSet::new();
        for def in order {
            let blocked = def
                .depends_on
                .iter()
                .any(|dep| selected_names.contains(dep) && !succeeded.contains(dep));
            if blocked {
                info!(job = %def.key(), "skip: predecessor did not succeed");
                continue;
            }
            if let JobOutcome::Success = self.execute_tracked(&def).await {
                succeeded.insert(def.name.clone());
            }
        }
    }

    /// Manual run: execute synchronously, refusing a concurrent run.
    pub async fn run_now(&self, def: &JobDef) -> Result<JobOutcome, EngineError> {
        if self.running.lock().contains_key(&def.key()) {
            return Err(EngineError::JobRunning(def.key()));
        }
        Ok(self.execute_tracked(def).await)
    }

    /// Signal the running job's process group; the run records a kill.
    pub fn kill(&self, key: &str) -> Result<(), EngineError> {
        let mut running = self.running.lock();
        let Some(info) = running.get_mut(key) else {
            return Err(EngineError::JobNotRunning(key.to_string()));
        };
        if info.pid <= 0 {
            // Claimed but not yet spawned.
            return Err(EngineError::JobNotRunning(key.to_string()));
        }
        info.killed = true;
        exec::terminate_group(info.pid);
        Ok(())
    }

    /// Atomically claim the running slot for a job.
    fn try_claim(&self, key: &str) -> bool {
        let mut running = self.running.lock();
        if running.contains_key(key) {
            return false;
        }
        running.insert(key.to_string(), RunningInfo { pid: 0, killed: false });
        true
    }

    /// Execute one job, updating the state store on every transition.
    async fn execute_tracked(&self, def: &JobDef) -> JobOutcome {
        let key = def.key();
        if !def.enabled {
            self.states.mark_disabled(&key);
            return JobOutcome::Skipped;
        }
        if !self.try_claim(&key) {
            info!(job = %key, "skip: already running");
            return JobOutcome::Skipped;
        }
        self.states.mark_running(&key, self.clock.now_utc());
        let outcome = self.execute(def).await;

        let now = self.clock.now_utc();
        let was_killed = {
            let mut running = self.running.lock();
            running.remove(&key).map(|info| info.killed).unwrap_or(false)
        };
        let outcome = match outcome {
            JobOutcome::Failed(_) | JobOutcome::Timeout if was_killed => {
                JobOutcome::Failed("killed".to_string())
            }
            other => other,
        };
        match &outcome {
            JobOutcome::Success => self.states.mark_success(&key, now),
            JobOutcome::Failed(error) => self.states.mark_failure(&key, error.clone(), now),
            JobOutcome::Timeout => self.states.mark_timeout(&key, now),
            JobOutcome::Skipped => {}
        }
        if let Err(e) = self.states.save(now) {
            warn!(job = %key, error = %e, "failed to persist job state");
        }
        info!(job = %key, outcome = ?outcome, "job finished");
        outcome
    }

    async fn execute(&self, def: &JobDef) -> JobOutcome {
        match def.kind {
            JobKind::Script => self.execute_script(def).await,
            JobKind::Command => self.execute_command(def).await,
            JobKind::Template => self.execute_template(def).await,
        }
    }

    async fn execute_script(&self, def: &JobDef) -> JobOutcome {
        let body = def.script.clone().unwrap_or_default();
        let script = match exec::write_script(&body) {
            Ok(file) => file,
            Err(e) => return JobOutcome::Failed(format!("failed to write script: {}", e)),
        };
        let spec = exec::CommandSpec {
            program: "sh".to_string(),
            args: vec![script.path().display().to_string()],
            env: self.job_env(def),
            cwd: def.working_dir.clone(),
        };
        // Keep the temp file alive for the whole run.
        let outcome = self.spawn_and_wait(def, spec).await;
        drop(script);
        outcome
    }

    async fn execute_command(&self, def: &JobDef) -> JobOutcome {
        let command = def.command.clone().unwrap_or_default();
        let spec = exec::CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), command],
            env: self.job_env(def),
            cwd: def.working_dir.clone(),
        };
        self.spawn_and_wait(def, spec).await
    }

    /// Deploy a registered template as a sub-workspace, bounded by the
    /// job's timeout.
    async fn execute_template(&self, def: &JobDef) -> JobOutcome {
        let Some(template_name) = def.template.as_deref() else {
            return JobOutcome::Failed("job has no template".to_string());
        };
        if self.templates.get(template_name).is_none() {
            return JobOutcome::Failed(format!("template not found: {}", template_name));
        }
        let dest = self.roots.deployment_dir(&format!("{}-{}", def.scope, def.name));
        if let Err(e) = copy_tree(&self.templates.tree_dir(template_name), &dest) {
            return JobOutcome::Failed(format!("failed to materialize template: {}", e));
        }
        let workspace = format!("{}-{}", def.scope, def.name);
        let request = DeployRequest { workspace: &workspace, dir: &dest, mode: None };
        match tokio::time::timeout(def.timeout, self.client.deploy(&request)).await {
            Ok(Ok(_)) => JobOutcome::Success,
            Ok(Err(e)) => JobOutcome::Failed(e.to_string()),
            Err(_) => JobOutcome::Timeout,
        }
    }

    async fn spawn_and_wait(&self, def: &JobDef, spec: exec::CommandSpec) -> JobOutcome {
        let key = def.key();
        let running = Arc::clone(&self.running);
        exec::run_in_group(spec, def.timeout, move |pid| {
            if let Some(info) = running.lock().get_mut(&key) {
                info.pid = pid;
            }
        })
        .await
    }

    fn job_env(&self, def: &JobDef) -> Vec<(String, String)> {
        let mut env = vec![
            ("PROVISIONER_WORKSPACE".to_string(), def.scope.clone()),
            ("PROVISIONER_JOB".to_string(), def.name.clone()),
        ];
        for (k, v) in &def.environment {
            env.push((k.clone(), v.clone()));
        }
        env
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
