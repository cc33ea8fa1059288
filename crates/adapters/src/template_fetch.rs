// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template fetching: shallow git clone, subtree copy, content hashing.
//!
//! The content hash covers the canonicalized tree (sorted relative paths,
//! path bytes and file bytes both hashed), so hash equality means "no
//! update needed" regardless of clone order or mtimes.

use crate::subprocess::{run_with_timeout, GIT_TIMEOUT};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git {operation} failed: {message}")]
    Git { operation: &'static str, message: String },

    #[error("source path '{0}' not found in repository")]
    SourcePathMissing(String),
}

/// Clone `url` and copy `source_path` (relative subtree, `.` for the whole
/// repo) into `dest`, replacing its contents. Returns the resolved commit.
pub async fn fetch_template(
    url: &str,
    source_path: &str,
    source_ref: Option<&str>,
    dest: &Path,
) -> Result<String, FetchError> {
    let scratch = tempfile::tempdir()?;
    let checkout = scratch.path().join("checkout");

    let mut cmd = Command::new("git");
    cmd.args(["clone", "--depth", "1"]);
    if let Some(r) = source_ref {
        cmd.args(["--branch", r]);
    }
    cmd.arg(url).arg(&checkout);
    cmd.env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    let output = run_with_timeout(cmd, GIT_TIMEOUT, "git clone")
        .await
        .map_err(|message| FetchError::Git { operation: "clone", message })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FetchError::Git {
            operation: "clone",
            message: stderr.trim().to_string(),
        });
    }

    let mut rev = Command::new("git");
    rev.args(["-C", &checkout.display().to_string(), "rev-parse", "HEAD"]);
    let output = run_with_timeout(rev, GIT_TIMEOUT, "git rev-parse")
        .await
        .map_err(|message| FetchError::Git { operation: "rev-parse", message })?;
    let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();

    let subtree = if source_path.is_empty() || source_path == "." {
        checkout.clone()
    } else {
        checkout.join(source_path)
    };
    if !subtree.is_dir() {
        return Err(FetchError::SourcePathMissing(source_path.to_string()));
    }

    if dest.exists() {
        std::fs::remove_dir_all(dest)?;
    }
    copy_tree(&subtree, dest)?;
    Ok(commit)
}

/// Recursively copy a directory tree, skipping `.git`.
pub fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        let from = entry.path();
        let to = dest.join(&name);
        if from.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

/// Sha256 over the canonicalized content tree, hex-encoded.
pub fn hash_tree(dir: &Path) -> std::io::Result<String> {
    let mut paths = Vec::new();
    collect_files(dir, dir, &mut paths)?;
    paths.sort();

    let mut hasher = Sha256::new();
    for rel in &paths {
        hasher.update(rel.as_bytes());
        hasher.update([0]);
        hasher.update(std::fs::read(dir.join(rel))?);
        hasher.update([0]);
    }
    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().into_owned());
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "template_fetch_tests.rs"]
mod tests;
