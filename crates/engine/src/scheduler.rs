// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler loop: one tick per minute.
//!
//! Each tick runs the throttled hot-reload check, evaluates every enabled
//! workspace's schedules against its state record, dispatches eligible
//! operations as tasks, ticks the job engine, and persists the stores.
//! The busy status in the store is the per-workspace mutex; eligibility
//! uses the catch-up query (`latest_before`) against the last honored
//! timestamp, which yields at-most-once per schedule slot and
//! deploy-on-startup for slots missed while the daemon was down.

use crate::engine::Engine;
use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use pv_config::{Workspace, WorkspaceRegistry};
use pv_core::{Clock, WorkspaceStatus};
use pv_storage::WorkspaceState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const TICK_INTERVAL: Duration = Duration::from_secs(60);
/// Hot-reload checks are throttled to at most one per this many seconds.
const RELOAD_CHECK_SECS: i64 = 30;

pub struct Scheduler<K: Clock> {
    engine: Arc<Engine<K>>,
    registry: Mutex<Arc<WorkspaceRegistry>>,
    last_reload_check: Mutex<Option<DateTime<Utc>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<K: Clock> Scheduler<K> {
    pub fn new(engine: Arc<Engine<K>>, registry: WorkspaceRegistry) -> Arc<Self> {
        engine.jobs.replace_defs(registry.all_jobs().into_iter().cloned().collect());
        Arc::new(Self {
            engine,
            registry: Mutex::new(Arc::new(registry)),
            last_reload_check: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn registry(&self) -> Arc<WorkspaceRegistry> {
        Arc::clone(&self.registry.lock())
    }

    /// Run until cancelled, then let in-flight operations complete and
    /// flush the stores.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!("scheduler started");
        loop {
            self.tick().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(TICK_INTERVAL) => {}
            }
        }
        info!("scheduler stopping; waiting for in-flight operations");
        self.settle().await;
        self.engine.persist();
    }

    /// One scheduler tick.
    ///
    /// The hot-reload check runs first, so a workspace whose configuration
    /// just changed is re-evaluated for deployment in this same tick: a
    /// newly enabled or newly fixed workspace goes live without waiting a
    /// minute.
    pub async fn tick(self: &Arc<Self>) {
        let now_utc = self.engine.clock.now_utc();
        let changed = self.maybe_reload(now_utc);
        if !changed.is_empty() {
            info!(workspaces = ?changed, "configuration changed");
        }

        let now_local = self.engine.clock.now_local();
        let registry = self.registry();
        for ws in registry.workspaces.values().filter(|w| w.enabled) {
            self.evaluate_workspace(ws, now_local);
        }

        let job_handles = self.engine.jobs.tick(now_local);
        self.tasks.lock().extend(job_handles);
        self.reap();
        self.engine.persist();
    }

    /// Await every dispatched task and event chain (shutdown and tests).
    pub async fn settle(&self) {
        loop {
            let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                let _ = task.await;
            }
        }
        self.engine.deployer.settle_events().await;
    }

    /// Drop handles of already-finished tasks.
    fn reap(&self) {
        self.tasks.lock().retain(|t| !t.is_finished());
    }

    // ── Hot reload ─────────────────────────────────────────────────────

    /// Throttled hot-reload check. Returns workspaces whose configuration
    /// advanced; their config-change transition has already been applied.
    fn maybe_reload(&self, now: DateTime<Utc>) -> Vec<String> {
        {
            let mut last = self.last_reload_check.lock();
            if last.map(|t| now - t < chrono::Duration::seconds(RELOAD_CHECK_SECS)).unwrap_or(false) {
                return Vec::new();
            }
            *last = Some(now);
        }
        let scanned_at = self.registry.lock().scanned_at();
        if !WorkspaceRegistry::tree_changed_since(&self.engine.roots, scanned_at) {
            return Vec::new();
        }

        let new_registry = match WorkspaceRegistry::load(&self.engine.roots) {
            Ok(registry) => registry,
            Err(e) => {
                // Keep serving the last good configuration.
                error!(error = %e, "configuration reload failed");
                return Vec::new();
            }
        };
        info!(workspaces = new_registry.workspaces.len(), "configuration reloaded");

        let old_registry = self.registry();
        let mut changed = Vec::new();
        for (name, ws) in &new_registry.workspaces {
            let advanced = old_registry
                .get(name)
                .map(|old| ws.config_mtime > old.config_mtime)
                .unwrap_or(true);
            if advanced {
                self.engine.store.config_changed(name, DateTime::<Utc>::from(ws.config_mtime));
                changed.push(name.clone());
            }
        }
        self.engine.jobs.replace_defs(new_registry.all_jobs().into_iter().cloned().collect());
        *self.registry.lock() = Arc::new(new_registry);
        changed
    }

    // ── Eligibility ────────────────────────────────────────────────────

    fn evaluate_workspace(self: &Arc<Self>, ws: &Workspace, now: DateTime<Local>) {
        let record = self.engine.store.workspace(&ws.name);
        if record.status.is_busy() {
            return;
        }
        // At most one operation per workspace per tick; deploy wins.
        if let Some(mode) = deploy_candidate(ws, &record, now) {
            self.dispatch_deploy(ws.clone(), mode);
        } else if destroy_due(ws, &record, now) {
            self.dispatch_destroy(ws.name.clone());
        }
    }

    fn dispatch_deploy(&self, ws: Workspace, mode: Option<String>) {
        let deployer = Arc::clone(&self.engine.deployer);
        let handle = tokio::spawn(async move {
            // Background operation: errors are recorded in state and logs.
            if let Err(e) = deployer.deploy(&ws, mode.as_deref()).await {
                warn!(workspace = %ws.name, error = %e, "scheduled deploy failed");
            }
        });
        self.tasks.lock().push(handle);
    }

    fn dispatch_destroy(&self, name: String) {
        let deployer = Arc::clone(&self.engine.deployer);
        let handle = tokio::spawn(async move {
            if let Err(e) = deployer.destroy(&name).await {
                warn!(workspace = %name, error = %e, "scheduled destroy failed");
            }
        });
        self.tasks.lock().push(handle);
    }
}

/// Whether a deploy is due, and in which mode.
///
/// Traditional workspaces: due when some deploy schedule has a slot today
/// that `last_deployed` has not honored. Mode-based workspaces: the mode
/// with the latest slot today is the desired mode; due when the current
/// `deployment_mode`/`last_deployed` pair does not cover it. Sticky
/// `deploy_failed` suppresses both forms.
fn deploy_candidate(
    ws: &Workspace,
    record: &WorkspaceState,
    now: DateTime<Local>,
) -> Option<Option<String>> {
    if ws.is_mode_based() {
        if record.status == WorkspaceStatus::DeployFailed {
            return None;
        }
        let mut desired: Option<(&str, DateTime<Local>)> = None;
        for (mode, crons) in &ws.mode_schedules {
            let Some(slot) = crons.iter().filter_map(|c| c.latest_before(now)).max() else {
                continue;
            };
            let later = desired.map(|(_, best)| slot > best).unwrap_or(true);
            if later {
                desired = Some((mode, slot));
            }
        }
        let (mode, slot) = desired?;
        let covered = record.deployment_mode.as_deref() == Some(mode)
            && record.last_deployed.map(|t| t >= slot.with_timezone(&Utc)).unwrap_or(false);
        if covered {
            return None;
        }
        return Some(Some(mode.to_string()));
    }

    if matches!(record.status, WorkspaceStatus::Deployed | WorkspaceStatus::DeployFailed) {
        return None;
    }
    let slot = ws.deploy_schedules.iter().filter_map(|c| c.latest_before(now)).max()?;
    let honored =
        record.last_deployed.map(|t| t >= slot.with_timezone(&Utc)).unwrap_or(false);
    if honored {
        None
    } else {
        Some(None)
    }
}

/// Whether a destroy is due. Permanent workspaces have no destroy
/// schedules and never qualify; sticky `destroy_failed` suppresses.
fn destroy_due(ws: &Workspace, record: &WorkspaceState, now: DateTime<Local>) -> bool {
    if matches!(record.status, WorkspaceStatus::Destroyed | WorkspaceStatus::DestroyFailed) {
        return false;
    }
    if record.status == WorkspaceStatus::Pending {
        return false;
    }
    let Some(slot) = ws.destroy_schedules.iter().filter_map(|c| c.latest_before(now)).max()
    else {
        return false;
    };
    !record.last_destroyed.map(|t| t >= slot.with_timezone(&Utc)).unwrap_or(false)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
