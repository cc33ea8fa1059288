// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The provisioner-tool client: the only place that shells out to the
//! infrastructure-as-code binary.
//!
//! `deploy`/`destroy` run `init` then `apply`/`destroy` in the workspace's
//! materialized directory, with `workspace_name` and `deployment_mode`
//! passed as tool variables. Captured output keeps its colors for the
//! per-workspace log; error text carried in [`ProvisionerError::ToolFailed`]
//! is ANSI-stripped and safe to persist.

use crate::ansi::strip_ansi;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("failed to run {tool}: {source}")]
    Spawn { tool: String, source: std::io::Error },

    /// Tool exited nonzero. `message` is ANSI-stripped; `raw` keeps the
    /// colored output for the workspace log.
    #[error("{operation} failed: {message}")]
    ToolFailed { operation: &'static str, message: String, raw: String },
}

/// Ground truth read from the tool's native state artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbedStatus {
    Deployed,
    Destroyed,
    Unknown,
}

impl std::fmt::Display for ProbedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deployed => write!(f, "deployed"),
            Self::Destroyed => write!(f, "destroyed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Captured output of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Full color-preserved stdout+stderr.
    pub raw: String,
}

/// One workspace operation handed to the client.
#[derive(Debug, Clone)]
pub struct DeployRequest<'a> {
    pub workspace: &'a str,
    /// The materialized deployment artifact directory.
    pub dir: &'a Path,
    pub mode: Option<&'a str>,
}

/// Abstract interface the deployment state machine drives.
#[async_trait]
pub trait ProvisionerClient: Send + Sync {
    async fn deploy(&self, req: &DeployRequest<'_>) -> Result<ToolOutput, ProvisionerError>;
    async fn destroy(&self, req: &DeployRequest<'_>) -> Result<ToolOutput, ProvisionerError>;

    /// Read the tool's native state artifacts for the ground-truth status.
    fn probe_status(&self, dir: &Path) -> ProbedStatus;

    /// Most recent mtime of the tool's state artifacts, as a fallback
    /// timestamp when the managed record has none.
    fn last_state_change(&self, dir: &Path) -> Option<DateTime<Utc>>;
}

const STATE_FILE: &str = "terraform.tfstate";
const STATE_BACKUP: &str = "terraform.tfstate.backup";

/// Client for an OpenTofu-compatible binary.
pub struct TofuClient {
    binary: PathBuf,
}

impl TofuClient {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    /// Binary from `PROVISIONER_TOOL`, defaulting to `tofu` on PATH.
    pub fn from_env() -> Self {
        let binary =
            std::env::var_os("PROVISIONER_TOOL").map(PathBuf::from).unwrap_or_else(|| "tofu".into());
        Self { binary }
    }

    async fn run(
        &self,
        dir: &Path,
        operation: &'static str,
        args: &[String],
    ) -> Result<ToolOutput, ProvisionerError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).current_dir(dir);
        let output = cmd.output().await.map_err(|source| ProvisionerError::Spawn {
            tool: self.binary.display().to_string(),
            source,
        })?;
        let mut raw = String::from_utf8_lossy(&output.stdout).into_owned();
        raw.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            return Err(ProvisionerError::ToolFailed {
                operation,
                message: strip_ansi(raw.trim()),
                raw,
            });
        }
        Ok(ToolOutput { raw })
    }

    fn var_args(req: &DeployRequest<'_>) -> Vec<String> {
        let mut args = vec!["-var".to_string(), format!("workspace_name={}", req.workspace)];
        if let Some(mode) = req.mode {
            args.push("-var".to_string());
            args.push(format!("deployment_mode={}", mode));
        }
        args
    }
}

#[async_trait]
impl ProvisionerClient for TofuClient {
    async fn deploy(&self, req: &DeployRequest<'_>) -> Result<ToolOutput, ProvisionerError> {
        let init = self
            .run(req.dir, "init", &["init".to_string(), "-input=false".to_string()])
            .await?;
        let mut args =
            vec!["apply".to_string(), "-auto-approve".to_string(), "-input=false".to_string()];
        args.extend(Self::var_args(req));
        let apply = self.run(req.dir, "apply", &args).await.map_err(|e| prepend_raw(e, &init.raw))?;
        Ok(ToolOutput { raw: format!("{}{}", init.raw, apply.raw) })
    }

    async fn destroy(&self, req: &DeployRequest<'_>) -> Result<ToolOutput, ProvisionerError> {
        let mut args =
            vec!["destroy".to_string(), "-auto-approve".to_string(), "-input=false".to_string()];
        args.extend(Self::var_args(req));
        self.run(req.dir, "destroy", &args).await
    }

    fn probe_status(&self, dir: &Path) -> ProbedStatus {
        let path = dir.join(STATE_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ProbedStatus::Destroyed,
            Err(_) => return ProbedStatus::Unknown,
        };
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(state) => {
                let has_resources = state
                    .get("resources")
                    .and_then(|r| r.as_array())
                    .map(|r| !r.is_empty())
                    .unwrap_or(false);
                if has_resources {
                    ProbedStatus::Deployed
                } else {
                    ProbedStatus::Destroyed
                }
            }
            Err(_) => ProbedStatus::Unknown,
        }
    }

    fn last_state_change(&self, dir: &Path) -> Option<DateTime<Utc>> {
        [STATE_FILE, STATE_BACKUP]
            .iter()
            .filter_map(|name| std::fs::metadata(dir.join(name)).and_then(|m| m.modified()).ok())
            .max()
            .map(DateTime::<Utc>::from)
    }
}

fn prepend_raw(err: ProvisionerError, prefix: &str) -> ProvisionerError {
    match err {
        ProvisionerError::ToolFailed { operation, message, raw } => ProvisionerError::ToolFailed {
            operation,
            message,
            raw: format!("{}{}", prefix, raw),
        },
        other => other,
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    //! Scriptable in-memory client for engine and scenario tests.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        pub operation: &'static str,
        pub workspace: String,
        pub mode: Option<String>,
    }

    #[derive(Default)]
    pub struct FakeProvisioner {
        calls: Mutex<Vec<RecordedCall>>,
        deploy_errors: Mutex<HashMap<String, String>>,
        destroy_errors: Mutex<HashMap<String, String>>,
        probes: Mutex<HashMap<PathBuf, ProbedStatus>>,
    }

    impl FakeProvisioner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make future deploys of `workspace` fail with `message`.
        pub fn fail_deploys(&self, workspace: &str, message: &str) {
            self.deploy_errors.lock().insert(workspace.to_string(), message.to_string());
        }

        pub fn clear_deploy_failure(&self, workspace: &str) {
            self.deploy_errors.lock().remove(workspace);
        }

        pub fn fail_destroys(&self, workspace: &str, message: &str) {
            self.destroy_errors.lock().insert(workspace.to_string(), message.to_string());
        }

        pub fn set_probe(&self, dir: &Path, status: ProbedStatus) {
            self.probes.lock().insert(dir.to_path_buf(), status);
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().clone()
        }

        fn record(&self, operation: &'static str, req: &DeployRequest<'_>) {
            self.calls.lock().push(RecordedCall {
                operation,
                workspace: req.workspace.to_string(),
                mode: req.mode.map(str::to_string),
            });
        }
    }

    #[async_trait]
    impl ProvisionerClient for FakeProvisioner {
        async fn deploy(&self, req: &DeployRequest<'_>) -> Result<ToolOutput, ProvisionerError> {
            self.record("deploy", req);
            if let Some(message) = self.deploy_errors.lock().get(req.workspace) {
                return Err(ProvisionerError::ToolFailed {
                    operation: "apply",
                    message: strip_ansi(message),
                    raw: message.clone(),
                });
            }
            Ok(ToolOutput { raw: format!("deployed {}\n", req.workspace) })
        }

        async fn destroy(&self, req: &DeployRequest<'_>) -> Result<ToolOutput, ProvisionerError> {
            self.record("destroy", req);
            if let Some(message) = self.destroy_errors.lock().get(req.workspace) {
                return Err(ProvisionerError::ToolFailed {
                    operation: "destroy",
                    message: strip_ansi(message),
                    raw: message.clone(),
                });
            }
            Ok(ToolOutput { raw: format!("destroyed {}\n", req.workspace) })
        }

        fn probe_status(&self, dir: &Path) -> ProbedStatus {
            self.probes.lock().get(dir).copied().unwrap_or(ProbedStatus::Unknown)
        }

        fn last_state_change(&self, _dir: &Path) -> Option<DateTime<Utc>> {
            None
        }
    }
}

#[cfg(test)]
#[path = "provisioner_tests.rs"]
mod tests;
