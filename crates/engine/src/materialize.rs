// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment artifact directories and their sidecar metadata.
//!
//! Each deployed workspace owns `deployments/<name>/`: the materialized
//! source files, the tool's native state artifacts, and the
//! `.provisioner-metadata` sidecar. The directory is created on first
//! deploy, preserved across redeploys (the tool reconciles), and removed
//! only by a successful destroy. Local `*.tf` source always wins over a
//! template reference.

use crate::error::EngineError;
use crate::templates::TemplateRegistry;
use chrono::{DateTime, Utc};
use pv_adapters::copy_tree;
use pv_config::{Roots, Workspace};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SIDECAR_FILE: &str = ".provisioner-metadata";

/// Sidecar blob recording what was materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidecarMeta {
    pub workspace_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

pub fn read_sidecar(dir: &Path) -> Option<SidecarMeta> {
    let text = std::fs::read_to_string(dir.join(SIDECAR_FILE)).ok()?;
    serde_json::from_str(&text).ok()
}

fn write_sidecar(dir: &Path, meta: &SidecarMeta) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(meta)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(dir.join(SIDECAR_FILE), json)
}

/// Prepare the deployment artifact directory for a deploy; returns its path.
pub fn materialize(
    ws: &Workspace,
    roots: &Roots,
    templates: &TemplateRegistry,
    now: DateTime<Utc>,
) -> Result<PathBuf, EngineError> {
    let dir = roots.deployment_dir(&ws.name);
    std::fs::create_dir_all(&dir)?;
    let existing = read_sidecar(&dir);
    let created_at = existing.as_ref().map(|s| s.created_at).unwrap_or(now);

    if ws.has_local_source {
        copy_local_source(&ws.dir, &dir)?;
        write_sidecar(
            &dir,
            &SidecarMeta {
                workspace_name: ws.name.clone(),
                template_name: None,
                template_hash: None,
                created_at,
                last_updated: now,
            },
        )?;
        return Ok(dir);
    }

    let Some(template_name) = &ws.template else {
        return Err(EngineError::NoSource(ws.name.clone()));
    };
    let meta = templates
        .get(template_name)
        .ok_or_else(|| crate::templates::TemplateError::NotFound(template_name.clone()))?;

    // Refresh the copy only when the recorded hash moved.
    let stale = existing
        .as_ref()
        .and_then(|s| s.template_hash.as_deref())
        .map(|h| h != meta.content_hash)
        .unwrap_or(true);
    if stale {
        copy_tree(&templates.tree_dir(template_name), &dir)?;
        write_sidecar(
            &dir,
            &SidecarMeta {
                workspace_name: ws.name.clone(),
                template_name: Some(template_name.clone()),
                template_hash: Some(meta.content_hash.clone()),
                created_at,
                last_updated: now,
            },
        )?;
    }
    Ok(dir)
}

fn copy_local_source(ws_dir: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(ws_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map(|e| e == "tf").unwrap_or(false) {
            std::fs::copy(&path, dest.join(entry.file_name()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "materialize_tests.rs"]
mod tests;
