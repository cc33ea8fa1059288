// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The deployment state machine.
//!
//! Every workspace operation, scheduled or manual, goes through here:
//! acquire the busy status in the store, materialize, invoke the
//! provisioner client, transition to the outcome status, emit the
//! lifecycle event. The busy status is the per-workspace mutex; a second
//! trigger observes `Busy` and backs off.

use crate::error::EngineError;
use crate::jobs::JobEngine;
use crate::materialize::materialize;
use crate::oplog;
use crate::templates::TemplateRegistry;
use parking_lot::Mutex;
use pv_adapters::{DeployRequest, ProvisionerClient, ProvisionerError};
use pv_config::{Roots, Workspace};
use pv_core::{Clock, EventKind, LifecycleEvent};
use pv_storage::StateStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub struct Deployer<K: Clock> {
    store: Arc<StateStore>,
    client: Arc<dyn ProvisionerClient>,
    templates: Arc<TemplateRegistry>,
    jobs: Arc<JobEngine<K>>,
    roots: Roots,
    clock: K,
    /// In-flight event-chain tasks; drained on shutdown and in tests.
    event_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<K: Clock> Deployer<K> {
    pub fn new(
        store: Arc<StateStore>,
        client: Arc<dyn ProvisionerClient>,
        templates: Arc<TemplateRegistry>,
        jobs: Arc<JobEngine<K>>,
        roots: Roots,
        clock: K,
    ) -> Self {
        Self {
            store,
            client,
            templates,
            jobs,
            roots,
            clock,
            event_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Deploy a workspace, optionally in a mode.
    ///
    /// The caller has already decided eligibility (schedule or manual
    /// policy); this enforces only the busy mutex and drives the machine.
    pub async fn deploy(&self, ws: &Workspace, mode: Option<&str>) -> Result<(), EngineError> {
        self.store.begin_deploy(&ws.name)?;
        info!(workspace = %ws.name, mode = mode.unwrap_or("-"), "deploy starting");
        let started = Instant::now();

        let dir = match materialize(ws, &self.roots, &self.templates, self.clock.now_utc()) {
            Ok(dir) => dir,
            Err(e) => {
                let message = e.to_string();
                self.store.fail_deploy(&ws.name, message.clone())?;
                self.emit_failure(EventKind::DeploymentFailed, &ws.name, mode, &message);
                return Err(e);
            }
        };

        let request = DeployRequest { workspace: &ws.name, dir: &dir, mode };
        match self.client.deploy(&request).await {
            Ok(output) => {
                let now = self.clock.now_utc();
                oplog::append(&self.roots.workspace_log(&ws.name), now, "deploy", &output.raw);
                self.store.complete_deploy(&ws.name, mode.map(str::to_string), now)?;
                info!(
                    workspace = %ws.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "deploy completed"
                );
                let event = LifecycleEvent::new(EventKind::DeploymentCompleted, &ws.name, now)
                    .with_mode(mode.map(str::to_string));
                self.emit(event);
                Ok(())
            }
            Err(e) => {
                let (message, raw) = split_error(e);
                let now = self.clock.now_utc();
                oplog::append(&self.roots.workspace_log(&ws.name), now, "deploy failed", &raw);
                self.store.fail_deploy(&ws.name, message.clone())?;
                error!(workspace = %ws.name, error = %message, "deploy failed");
                self.emit_failure(EventKind::DeploymentFailed, &ws.name, mode, &message);
                Err(EngineError::DeployFailed(message))
            }
        }
    }

    /// Destroy a workspace. The deployment artifact directory is removed
    /// only on success.
    pub async fn destroy(&self, name: &str) -> Result<(), EngineError> {
        self.store.begin_destroy(name)?;
        info!(workspace = %name, "destroy starting");
        let dir = self.roots.deployment_dir(name);

        let request = DeployRequest { workspace: name, dir: &dir, mode: None };
        match self.client.destroy(&request).await {
            Ok(output) => {
                let now = self.clock.now_utc();
                oplog::append(&self.roots.workspace_log(name), now, "destroy", &output.raw);
                self.store.complete_destroy(name, now)?;
                if dir.exists() {
                    if let Err(e) = std::fs::remove_dir_all(&dir) {
                        error!(workspace = %name, error = %e, "failed to remove deployment dir");
                    }
                }
                info!(workspace = %name, "destroy completed");
                self.emit(LifecycleEvent::new(EventKind::DestroyCompleted, name, now));
                Ok(())
            }
            Err(e) => {
                let (message, raw) = split_error(e);
                let now = self.clock.now_utc();
                oplog::append(&self.roots.workspace_log(name), now, "destroy failed", &raw);
                self.store.fail_destroy(name, message.clone())?;
                error!(workspace = %name, error = %message, "destroy failed");
                self.emit_failure(EventKind::DestroyFailed, name, None, &message);
                Err(EngineError::DestroyFailed(message))
            }
        }
    }

    /// The job engine consuming this deployer's lifecycle events.
    pub fn jobs(&self) -> &Arc<JobEngine<K>> {
        &self.jobs
    }

    /// Synthesize the startup event for `@reboot` jobs.
    pub fn emit_reboot(&self) {
        let event = LifecycleEvent::new(
            EventKind::Reboot,
            pv_core::STANDALONE_SCOPE,
            self.clock.now_utc(),
        );
        self.emit(event);
    }

    fn emit(&self, event: LifecycleEvent) {
        if let Some(handle) = self.jobs.handle_event(&event) {
            self.event_tasks.lock().push(handle);
        }
    }

    fn emit_failure(&self, kind: EventKind, name: &str, mode: Option<&str>, message: &str) {
        let event = LifecycleEvent::new(kind, name, self.clock.now_utc())
            .with_mode(mode.map(str::to_string))
            .with_error(message);
        self.emit(event);
    }

    /// Await every event-chain task spawned so far.
    pub async fn settle_events(&self) {
        loop {
            let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.event_tasks.lock());
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                let _ = task.await;
            }
        }
    }
}

/// Split a client error into (stripped message for state, raw for the log).
fn split_error(e: ProvisionerError) -> (String, String) {
    match e {
        ProvisionerError::ToolFailed { message, raw, .. } => (message, raw),
        other => {
            let message = other.to_string();
            (message.clone(), message)
        }
    }
}

#[cfg(test)]
#[path = "deployer_tests.rs"]
mod tests;
