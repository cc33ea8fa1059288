// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine hub: stores, registries, client, and the deployment machine,
//! wired once and shared by the scheduler and the operations surface.

use crate::deployer::Deployer;
use crate::jobs::JobEngine;
use crate::templates::TemplateRegistry;
use crate::EngineError;
use pv_adapters::ProvisionerClient;
use pv_config::Roots;
use pv_core::Clock;
use pv_storage::{JobStateStore, StateStore};
use std::sync::Arc;

pub struct Engine<K: Clock> {
    pub roots: Roots,
    pub clock: K,
    pub client: Arc<dyn ProvisionerClient>,
    pub store: Arc<StateStore>,
    pub job_states: Arc<JobStateStore>,
    pub templates: Arc<TemplateRegistry>,
    pub jobs: Arc<JobEngine<K>>,
    pub deployer: Arc<Deployer<K>>,
}

impl<K: Clock> Engine<K> {
    /// Create required directories and load both stores and the template
    /// registry. Unreadable state or an un-createable directory is fatal.
    pub fn open(
        roots: Roots,
        client: Arc<dyn ProvisionerClient>,
        clock: K,
    ) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&roots.state_dir)?;
        std::fs::create_dir_all(roots.deployments_dir())?;
        std::fs::create_dir_all(&roots.log_dir)?;

        let store = Arc::new(StateStore::load(&roots.state_file())?);
        let job_states = Arc::new(JobStateStore::load(&roots.job_state_file())?);
        let templates = Arc::new(TemplateRegistry::load(&roots)?);
        let jobs = Arc::new(JobEngine::new(
            Arc::clone(&job_states),
            Arc::clone(&client),
            Arc::clone(&templates),
            roots.clone(),
            clock.clone(),
        ));
        let deployer = Arc::new(Deployer::new(
            Arc::clone(&store),
            Arc::clone(&client),
            Arc::clone(&templates),
            Arc::clone(&jobs),
            roots.clone(),
            clock.clone(),
        ));
        Ok(Self { roots, clock, client, store, job_states, templates, jobs, deployer })
    }

    /// Persist both stores, stamping the current time.
    pub fn persist(&self) {
        let now = self.clock.now_utc();
        if let Err(e) = self.store.save(now) {
            tracing::error!(error = %e, "failed to persist scheduler state");
        }
        if let Err(e) = self.job_states.save(now) {
            tracing::error!(error = %e, "failed to persist job state");
        }
    }
}
