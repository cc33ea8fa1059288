// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared construction for the CLI binaries: resolve roots, build the
//! provisioner client, open the engine.

use crate::exit_error::ExitError;
use pv_adapters::{ProvisionerClient, TofuClient};
use pv_config::Roots;
use pv_core::SystemClock;
use pv_engine::{Engine, Operations};
use std::sync::Arc;

pub struct CliContext {
    pub roots: Roots,
    pub engine: Arc<Engine<SystemClock>>,
    pub ops: Operations<SystemClock>,
}

impl CliContext {
    /// Build the context the ctl binaries share. `dev` switches the
    /// directory-root defaults; env vars override either way.
    pub fn open(dev: bool) -> Result<Self, ExitError> {
        let roots = Roots::resolve(dev);
        let client: Arc<dyn ProvisionerClient> = Arc::new(TofuClient::from_env());
        let engine = Engine::open(roots.clone(), client, SystemClock)
            .map_err(|e| ExitError::failure(e.to_string()))?;
        let engine = Arc::new(engine);
        let ops = Operations::new(Arc::clone(&engine));
        Ok(Self { roots, engine, ops })
    }
}
