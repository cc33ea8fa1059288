// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definitions: raw `config.json` shape and the validated form.

use crate::error::ConfigError;
use crate::schedule_shape::ScheduleField;
use chrono::{DateTime, Local};
use pv_core::{parse_duration, scoped_name, EventKind, Schedule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// What a job executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Inline script body written to a temp file and run with the shell.
    Script,
    /// Single command line run through the shell.
    Command,
    /// Deploy of a registered template as a sub-workspace.
    Template,
}

fn default_timeout() -> String {
    "30m".to_string()
}

fn default_enabled() -> bool {
    true
}

/// Job definition as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJobConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub schedule: ScheduleField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_timeout")]
    pub timeout: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Validated, normalized job definition.
#[derive(Debug, Clone)]
pub struct JobDef {
    pub scope: String,
    pub name: String,
    pub kind: JobKind,
    pub schedules: Vec<Schedule>,
    pub script: Option<String>,
    pub command: Option<String>,
    pub template: Option<String>,
    pub environment: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub depends_on: Vec<String>,
    pub enabled: bool,
    pub description: Option<String>,
}

impl JobDef {
    /// Validate and normalize a raw definition for the given scope.
    pub fn from_raw(scope: &str, raw: RawJobConfig) -> Result<Self, ConfigError> {
        if raw.name.trim().is_empty() {
            return Err(ConfigError::Invalid("job name is empty".to_string()));
        }
        if raw.name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "job name '{}' must not contain '/'",
                raw.name
            )));
        }
        let body = match raw.kind {
            JobKind::Script => raw.script.is_some(),
            JobKind::Command => raw.command.is_some(),
            JobKind::Template => raw.template.is_some(),
        };
        if !body {
            return Err(ConfigError::Invalid(format!(
                "job '{}' is missing its {} body",
                raw.name,
                match raw.kind {
                    JobKind::Script => "script",
                    JobKind::Command => "command",
                    JobKind::Template => "template",
                }
            )));
        }
        let schedules = raw.schedule.to_schedules()?;
        let timeout = parse_duration(&raw.timeout).map_err(|e| {
            ConfigError::Invalid(format!("job '{}' timeout: {}", raw.name, e))
        })?;
        Ok(Self {
            scope: scope.to_string(),
            name: raw.name,
            kind: raw.kind,
            schedules,
            script: raw.script,
            command: raw.command,
            template: raw.template,
            environment: raw.environment,
            working_dir: raw.working_dir,
            timeout,
            depends_on: raw.depends_on,
            enabled: raw.enabled,
            description: raw.description,
        })
    }

    /// The `scope/name` key used by the state store.
    pub fn key(&self) -> String {
        scoped_name(&self.scope, &self.name)
    }

    /// Whether any schedule entry fires on the given event kind.
    pub fn triggered_by(&self, kind: EventKind) -> bool {
        self.schedules.iter().any(|s| s.matches_event(kind))
    }

    /// Whether any time-cron entry matches the minute of `t`.
    pub fn matches_minute(&self, t: DateTime<Local>) -> bool {
        self.schedules.iter().any(|s| s.matches_time(t))
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
