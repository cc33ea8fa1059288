// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-group execution for jobs.
//!
//! Children are spawned with `process_group(0)` so termination (timeout or
//! manual kill) signals the whole tree, not just the direct child.

use super::JobOutcome;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::warn;

pub(super) struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

/// Write a script body to a temp file the shell can run.
pub(super) fn write_script(body: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().prefix("pv-job-").suffix(".sh").tempfile()?;
    file.write_all(body.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// SIGTERM the process group rooted at `pid`. Best-effort.
pub(super) fn terminate_group(pid: i32) {
    if pid <= 0 {
        return;
    }
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGTERM) {
        warn!(pid, error = %e, "failed to signal process group");
    }
}

/// Spawn the command in its own process group and wait, bounded by
/// `timeout`. `on_spawn` receives the group leader's pid before waiting.
pub(super) async fn run_in_group(
    spec: CommandSpec,
    timeout: Duration,
    on_spawn: impl FnOnce(i32),
) -> JobOutcome {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return JobOutcome::Failed(format!("failed to spawn {}: {}", spec.program, e)),
    };
    let pid = child.id().map(|p| p as i32).unwrap_or(0);
    on_spawn(pid);

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => JobOutcome::Success,
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            if detail.is_empty() {
                JobOutcome::Failed(output.status.to_string())
            } else {
                JobOutcome::Failed(format!("{}: {}", output.status, tail(detail, 500)))
            }
        }
        Ok(Err(e)) => JobOutcome::Failed(format!("wait failed: {}", e)),
        Err(_elapsed) => {
            // The dropped wait future kills the direct child; the group gets
            // an explicit signal for anything it spawned.
            terminate_group(pid);
            JobOutcome::Timeout
        }
    }
}

fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
