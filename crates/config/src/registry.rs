// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace and standalone-job loading from the configuration tree.
//!
//! Invalid workspaces are quarantined with a recorded error; a circular job
//! dependency anywhere fails the whole load so the daemon exits nonzero.

use crate::dag;
use crate::error::ConfigError;
use crate::job::{JobDef, RawJobConfig};
use crate::roots::Roots;
use crate::workspace::{RawWorkspaceConfig, Workspace};
use pv_core::STANDALONE_SCOPE;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::warn;

/// The loaded configuration tree.
#[derive(Debug)]
pub struct WorkspaceRegistry {
    pub workspaces: BTreeMap<String, Workspace>,
    /// Workspaces rejected at load: `(name, error text)`.
    pub errors: Vec<(String, String)>,
    pub standalone_jobs: Vec<JobDef>,
    scanned_at: SystemTime,
}

impl Default for WorkspaceRegistry {
    fn default() -> Self {
        Self {
            workspaces: BTreeMap::new(),
            errors: Vec::new(),
            standalone_jobs: Vec::new(),
            scanned_at: SystemTime::UNIX_EPOCH,
        }
    }
}

impl WorkspaceRegistry {
    /// Scan `workspaces/` and `jobs/` under the config root.
    pub fn load(roots: &Roots) -> Result<Self, ConfigError> {
        let mut registry = WorkspaceRegistry {
            scanned_at: SystemTime::now(),
            ..Default::default()
        };

        let ws_dir = roots.workspaces_dir();
        if ws_dir.is_dir() {
            for entry in fs::read_dir(&ws_dir)? {
                let entry = entry?;
                if !entry.path().is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                match load_workspace(&name, &entry.path()) {
                    Ok(ws) => {
                        registry.workspaces.insert(name, ws);
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(workspace = %name, error = %e, "skipping invalid workspace");
                        registry.errors.push((name, e.to_string()));
                    }
                }
            }
        }

        registry.load_standalone_jobs(&roots.jobs_dir())?;
        Ok(registry)
    }

    fn load_standalone_jobs(&mut self, jobs_dir: &Path) -> Result<(), ConfigError> {
        if !jobs_dir.is_dir() {
            return Ok(());
        }
        for entry in fs::read_dir(jobs_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let file = path.display().to_string();
            match load_job_file(&path) {
                Ok(job) => self.standalone_jobs.push(job),
                Err(e) => {
                    warn!(file = %file, error = %e, "skipping invalid job file");
                    self.errors.push((file, e.to_string()));
                }
            }
        }
        // A cycle fails the load; other scope-level errors (duplicate name,
        // unknown dependency) quarantine the standalone scope like any
        // invalid workspace.
        if let Err(e) = dag::validate(STANDALONE_SCOPE, &self.standalone_jobs) {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(error = %e, "skipping standalone jobs");
            self.errors.push((jobs_dir.display().to_string(), e.to_string()));
            self.standalone_jobs.clear();
        }
        Ok(())
    }

    pub fn scanned_at(&self) -> SystemTime {
        self.scanned_at
    }

    pub fn get(&self, name: &str) -> Option<&Workspace> {
        self.workspaces.get(name)
    }

    /// Every job known to the registry: embedded first, then standalone.
    pub fn all_jobs(&self) -> Vec<&JobDef> {
        self.workspaces
            .values()
            .flat_map(|ws| ws.jobs.iter())
            .chain(self.standalone_jobs.iter())
            .collect()
    }

    /// Jobs in one scope (a workspace name or the standalone scope).
    pub fn jobs_in_scope(&self, scope: &str) -> Vec<&JobDef> {
        if scope == STANDALONE_SCOPE {
            return self.standalone_jobs.iter().collect();
        }
        self.workspaces.get(scope).map(|ws| ws.jobs.iter().collect()).unwrap_or_default()
    }

    /// Whether any workspace config file changed after `since`.
    ///
    /// This is the cheap walk the hot-reload throttle uses before paying for
    /// a full reload.
    pub fn tree_changed_since(roots: &Roots, since: SystemTime) -> bool {
        let ws_dir = roots.workspaces_dir();
        let Ok(entries) = fs::read_dir(&ws_dir) else {
            return false;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Ok(mtime) = workspace_mtime(&path) {
                if mtime > since {
                    return true;
                }
            }
        }
        false
    }
}

fn load_workspace(name: &str, dir: &Path) -> Result<Workspace, ConfigError> {
    let config_path = dir.join("config.json");
    let text = fs::read_to_string(&config_path)?;
    let raw: RawWorkspaceConfig = serde_json::from_str(&text)
        .map_err(|source| ConfigError::Json { path: config_path, source })?;
    let mtime = workspace_mtime(dir)?;
    let has_local_source = has_tf_source(dir);
    Workspace::from_raw(name, dir.to_path_buf(), raw, mtime, has_local_source)
}

fn load_job_file(path: &Path) -> Result<JobDef, ConfigError> {
    let text = fs::read_to_string(path)?;
    let raw: RawJobConfig = serde_json::from_str(&text)
        .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })?;
    JobDef::from_raw(STANDALONE_SCOPE, raw)
}

/// Max mtime of `config.json` and any `*.tf` file in the directory.
pub fn workspace_mtime(dir: &Path) -> std::io::Result<SystemTime> {
    let mut max = fs::metadata(dir.join("config.json"))?.modified()?;
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == "tf").unwrap_or(false) {
            if let Ok(mtime) = entry.metadata().and_then(|m| m.modified()) {
                if mtime > max {
                    max = mtime;
                }
            }
        }
    }
    Ok(max)
}

fn has_tf_source(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .any(|e| e.path().extension().map(|ext| ext == "tf").unwrap_or(false))
        })
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
