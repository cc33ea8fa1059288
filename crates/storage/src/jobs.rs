// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job state partition: per-`scope/name` run records and counters.
//!
//! Counters are monotonic; every dispatch bumps `run_count` before the
//! outcome lands.

use crate::atomic;
use crate::error::StateError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pv_core::JobStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Durable per-job record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JobStates {
    #[serde(default)]
    jobs: BTreeMap<String, JobState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
}

/// Durable job state, keyed by `scope/name`.
pub struct JobStateStore {
    path: PathBuf,
    inner: Mutex<JobStates>,
}

impl JobStateStore {
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let inner = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StateError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => JobStates::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path: path.to_path_buf(), inner: Mutex::new(inner) })
    }

    pub fn save(&self, now: DateTime<Utc>) -> Result<(), StateError> {
        let mut state = self.inner.lock();
        state.last_updated = Some(now);
        atomic::write_json(&self.path, &*state)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> JobState {
        self.inner.lock().jobs.get(key).cloned().unwrap_or_default()
    }

    pub fn all(&self) -> BTreeMap<String, JobState> {
        self.inner.lock().jobs.clone()
    }

    /// Whether a run is currently recorded in flight.
    pub fn is_running(&self, key: &str) -> bool {
        self.inner.lock().jobs.get(key).map(|j| j.status == JobStatus::Running).unwrap_or(false)
    }

    /// Dispatch: status -> running, `run_count` += 1, `last_run` stamped.
    pub fn mark_running(&self, key: &str, at: DateTime<Utc>) {
        let mut state = self.inner.lock();
        let record = state.jobs.entry(key.to_string()).or_default();
        record.status = JobStatus::Running;
        record.run_count += 1;
        record.last_run = Some(at);
    }

    pub fn mark_success(&self, key: &str, at: DateTime<Utc>) {
        let mut state = self.inner.lock();
        let record = state.jobs.entry(key.to_string()).or_default();
        record.status = JobStatus::Success;
        record.success_count += 1;
        record.last_success = Some(at);
        record.last_error = None;
    }

    pub fn mark_failure(&self, key: &str, error: impl Into<String>, at: DateTime<Utc>) {
        let mut state = self.inner.lock();
        let record = state.jobs.entry(key.to_string()).or_default();
        record.status = JobStatus::Failed;
        record.failure_count += 1;
        record.last_failure = Some(at);
        record.last_error = Some(error.into());
    }

    /// Timeout counts toward `failure_count` but keeps its own status.
    pub fn mark_timeout(&self, key: &str, at: DateTime<Utc>) {
        let mut state = self.inner.lock();
        let record = state.jobs.entry(key.to_string()).or_default();
        record.status = JobStatus::Timeout;
        record.failure_count += 1;
        record.last_failure = Some(at);
        record.last_error = Some("timed out".to_string());
    }

    pub fn mark_disabled(&self, key: &str) {
        let mut state = self.inner.lock();
        let record = state.jobs.entry(key.to_string()).or_default();
        record.status = JobStatus::Disabled;
    }

    pub fn set_next_run(&self, key: &str, at: Option<DateTime<Utc>>) {
        let mut state = self.inner.lock();
        let record = state.jobs.entry(key.to_string()).or_default();
        record.next_run = at;
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
