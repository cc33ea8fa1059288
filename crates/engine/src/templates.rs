// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The template registry: named, versioned, content-hashed source trees.
//!
//! Metadata lives in `templates/registry.json` next to one stored tree per
//! template under `templates/<name>/`. `add` and `update` fetch from the
//! remote; `validate` re-hashes the stored tree and reports drift. Removing
//! a template that workspaces still reference is allowed; their next
//! deploy fails with "template not found".

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pv_adapters::{fetch_template, hash_tree, FetchError};
use pv_config::Roots;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unreadable template registry {path}: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },

    #[error("template not found: {0}")]
    NotFound(String),

    #[error("template '{0}' already exists")]
    Exists(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Persisted per-template metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMeta {
    pub name: String,
    pub source_url: String,
    pub source_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Bumped whenever an update lands a new content hash.
    pub version: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    templates: BTreeMap<String, TemplateMeta>,
}

/// Outcome of `update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Unchanged,
    Updated { old_hash: String, new_hash: String },
}

/// Outcome of `validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateReport {
    pub name: String,
    pub stored_hash: String,
    pub actual_hash: String,
}

impl ValidateReport {
    pub fn is_clean(&self) -> bool {
        self.stored_hash == self.actual_hash
    }
}

pub struct TemplateRegistry {
    roots: Roots,
    templates: Mutex<BTreeMap<String, TemplateMeta>>,
}

impl TemplateRegistry {
    /// Load the registry file; missing means empty.
    pub fn load(roots: &Roots) -> Result<Self, TemplateError> {
        let path = roots.template_registry_file();
        let file: RegistryFile = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|source| TemplateError::Corrupt { path, source })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RegistryFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { roots: roots.clone(), templates: Mutex::new(file.templates) })
    }

    fn persist(&self) -> Result<(), TemplateError> {
        let path = self.roots.template_registry_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = RegistryFile { templates: self.templates.lock().clone() };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Where a template's stored tree lives.
    pub fn tree_dir(&self, name: &str) -> PathBuf {
        self.roots.template_tree_dir(name)
    }

    pub fn get(&self, name: &str) -> Option<TemplateMeta> {
        self.templates.lock().get(name).cloned()
    }

    pub fn list(&self) -> Vec<TemplateMeta> {
        self.templates.lock().values().cloned().collect()
    }

    /// Fetch, hash, and register a new template.
    pub async fn add(
        &self,
        name: &str,
        source_url: &str,
        source_path: &str,
        source_ref: Option<&str>,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TemplateMeta, TemplateError> {
        if self.templates.lock().contains_key(name) {
            return Err(TemplateError::Exists(name.to_string()));
        }
        let dest = self.tree_dir(name);
        fetch_template(source_url, source_path, source_ref, &dest).await?;
        let content_hash = hash_tree(&dest)?;
        let meta = TemplateMeta {
            name: name.to_string(),
            source_url: source_url.to_string(),
            source_path: source_path.to_string(),
            source_ref: source_ref.map(str::to_string),
            created_at: now,
            updated_at: now,
            content_hash,
            description: description.map(str::to_string),
            version: 1,
        };
        self.templates.lock().insert(name.to_string(), meta.clone());
        self.persist()?;
        Ok(meta)
    }

    /// Refetch a template; bumps version only when the hash moved.
    pub async fn update(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, TemplateError> {
        let meta = self.get(name).ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        let dest = self.tree_dir(name);
        fetch_template(&meta.source_url, &meta.source_path, meta.source_ref.as_deref(), &dest)
            .await?;
        let new_hash = hash_tree(&dest)?;
        if new_hash == meta.content_hash {
            return Ok(UpdateOutcome::Unchanged);
        }
        let old_hash = meta.content_hash.clone();
        {
            let mut templates = self.templates.lock();
            if let Some(entry) = templates.get_mut(name) {
                entry.content_hash = new_hash.clone();
                entry.updated_at = now;
                entry.version += 1;
            }
        }
        self.persist()?;
        Ok(UpdateOutcome::Updated { old_hash, new_hash })
    }

    /// Update every registered template, collecting per-name outcomes.
    pub async fn update_all(
        &self,
        now: DateTime<Utc>,
    ) -> Vec<(String, Result<UpdateOutcome, TemplateError>)> {
        let names: Vec<String> = self.templates.lock().keys().cloned().collect();
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            let outcome = self.update(&name, now).await;
            results.push((name, outcome));
        }
        results
    }

    /// Drop the metadata and stored tree.
    ///
    /// Referencing workspaces are not consulted; their next deploy fails
    /// with "template not found".
    pub fn remove(&self, name: &str) -> Result<(), TemplateError> {
        if self.templates.lock().remove(name).is_none() {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        let tree = self.tree_dir(name);
        if tree.exists() {
            std::fs::remove_dir_all(&tree)?;
        }
        self.persist()
    }

    /// Re-hash the stored tree against the recorded hash.
    pub fn validate(&self, name: &str) -> Result<ValidateReport, TemplateError> {
        let meta = self.get(name).ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        let actual_hash = hash_tree(&self.tree_dir(name))?;
        Ok(ValidateReport { name: name.to_string(), stored_hash: meta.content_hash, actual_hash })
    }

    pub fn validate_all(&self) -> Vec<(String, Result<ValidateReport, TemplateError>)> {
        let names: Vec<String> = self.templates.lock().keys().cloned().collect();
        names.into_iter().map(|name| (name.clone(), self.validate(&name))).collect()
    }
}

#[cfg(test)]
#[path = "templates_tests.rs"]
mod tests;
