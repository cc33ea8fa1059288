// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace definitions: raw `config.json` shape and the validated form.

use crate::dag;
use crate::error::ConfigError;
use crate::job::{JobDef, RawJobConfig};
use crate::schedule_shape::ScheduleField;
use pv_core::CronExpr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

fn default_enabled() -> bool {
    true
}

/// Workspace definition as written in `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWorkspaceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_schedule: Option<ScheduleField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy_schedule: Option<ScheduleField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_schedules: Option<BTreeMap<String, ScheduleField>>,
    #[serde(default)]
    pub jobs: Vec<RawJobConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Validated workspace with normalized schedules and jobs.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub name: String,
    /// The workspace's directory under `workspaces/`.
    pub dir: PathBuf,
    pub enabled: bool,
    pub template: Option<String>,
    pub description: Option<String>,
    /// Traditional deploy schedules; empty for mode-based workspaces.
    pub deploy_schedules: Vec<CronExpr>,
    /// Destroy schedules; empty when permanent or unset.
    pub destroy_schedules: Vec<CronExpr>,
    /// The literal `false` destroy schedule: never auto-destroy.
    pub permanent: bool,
    /// Mode-based deploy schedules; empty for traditional workspaces.
    pub mode_schedules: BTreeMap<String, Vec<CronExpr>>,
    pub jobs: Vec<JobDef>,
    /// Max mtime of `config.json` and local `*.tf` files at load time.
    pub config_mtime: SystemTime,
    /// Local provisioner source present; wins over `template`.
    pub has_local_source: bool,
}

impl Workspace {
    pub fn from_raw(
        name: &str,
        dir: PathBuf,
        raw: RawWorkspaceConfig,
        config_mtime: SystemTime,
        has_local_source: bool,
    ) -> Result<Self, ConfigError> {
        if raw.deploy_schedule.is_some() && raw.mode_schedules.is_some() {
            return Err(ConfigError::Invalid(format!(
                "workspace '{}': deploy_schedule and mode_schedules are mutually exclusive",
                name
            )));
        }
        let mode_schedules = match &raw.mode_schedules {
            Some(modes) => {
                if raw.template.is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "workspace '{}': mode_schedules requires a template",
                        name
                    )));
                }
                if modes.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "workspace '{}': mode_schedules is empty",
                        name
                    )));
                }
                let mut normalized = BTreeMap::new();
                for (mode, field) in modes {
                    normalized.insert(mode.clone(), field.to_crons(false)?);
                }
                normalized
            }
            None => BTreeMap::new(),
        };

        let deploy_schedules = match &raw.deploy_schedule {
            Some(field) => field.to_crons(false)?,
            None => Vec::new(),
        };
        let (destroy_schedules, permanent) = match &raw.destroy_schedule {
            Some(field) if field.is_permanent() => (Vec::new(), true),
            Some(field) => (field.to_crons(true)?, false),
            None => (Vec::new(), false),
        };

        let mut jobs = Vec::with_capacity(raw.jobs.len());
        for raw_job in raw.jobs {
            jobs.push(JobDef::from_raw(name, raw_job)?);
        }
        dag::validate(name, &jobs)?;

        Ok(Self {
            name: name.to_string(),
            dir,
            enabled: raw.enabled,
            template: raw.template,
            description: raw.description,
            deploy_schedules,
            destroy_schedules,
            permanent,
            mode_schedules,
            jobs,
            config_mtime,
            has_local_source,
        })
    }

    pub fn is_mode_based(&self) -> bool {
        !self.mode_schedules.is_empty()
    }

    /// Summarize schedules for `list` output.
    pub fn schedule_summary(&self) -> String {
        if self.is_mode_based() {
            let modes: Vec<String> = self
                .mode_schedules
                .iter()
                .map(|(mode, crons)| {
                    let sources: Vec<&str> = crons.iter().map(|c| c.source()).collect();
                    format!("{}: {}", mode, sources.join(" | "))
                })
                .collect();
            return modes.join("; ");
        }
        let deploy: Vec<&str> = self.deploy_schedules.iter().map(|c| c.source()).collect();
        let destroy = if self.permanent {
            "never".to_string()
        } else {
            self.destroy_schedules.iter().map(|c| c.source()).collect::<Vec<_>>().join(" | ")
        };
        match (deploy.is_empty(), destroy.is_empty()) {
            (true, true) => "manual".to_string(),
            (false, true) => format!("deploy {}", deploy.join(" | ")),
            (true, false) => format!("destroy {}", destroy),
            (false, false) => format!("deploy {} / destroy {}", deploy.join(" | "), destroy),
        }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
