// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use std::path::Path;
use tempfile::TempDir;

fn git_repo_with(files: &[(&str, &str)]) -> TempDir {
    let repo = TempDir::new().unwrap();
    for (rel, contents) in files {
        let path = repo.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
    for args in [
        vec!["init", "-q"],
        vec!["config", "user.email", "ops@example.com"],
        vec!["config", "user.name", "ops"],
        vec!["add", "."],
        vec!["commit", "-q", "-m", "seed"],
    ] {
        let status = std::process::Command::new("git")
            .args(&args)
            .current_dir(repo.path())
            .status()
            .unwrap();
        assert!(status.success(), "git {:?}", args);
    }
    repo
}

fn commit_all(repo: &Path, message: &str) {
    for args in [vec!["add", "."], vec!["commit", "-q", "-m", message]] {
        let status =
            std::process::Command::new("git").args(&args).current_dir(repo).status().unwrap();
        assert!(status.success());
    }
}

#[tokio::test]
async fn add_fetches_hashes_and_persists() {
    let repo = git_repo_with(&[("infra/main.tf", "resource {}")]);
    let base = TempDir::new().unwrap();
    let roots = Roots::under(base.path());
    let registry = TemplateRegistry::load(&roots).unwrap();

    let meta = registry
        .add("web", &repo.path().display().to_string(), "infra", None, Some("web stack"), Utc::now())
        .await
        .unwrap();
    assert_eq!(meta.version, 1);
    assert!(!meta.content_hash.is_empty());
    assert!(registry.tree_dir("web").join("main.tf").exists());

    // A fresh load sees the persisted metadata.
    let reloaded = TemplateRegistry::load(&roots).unwrap();
    assert_eq!(reloaded.get("web").unwrap().content_hash, meta.content_hash);
}

#[tokio::test]
async fn duplicate_add_rejected() {
    let repo = git_repo_with(&[("main.tf", "x")]);
    let base = TempDir::new().unwrap();
    let registry = TemplateRegistry::load(&Roots::under(base.path())).unwrap();
    let url = repo.path().display().to_string();

    registry.add("dup", &url, ".", None, None, Utc::now()).await.unwrap();
    let err = registry.add("dup", &url, ".", None, None, Utc::now()).await.unwrap_err();
    assert!(matches!(err, TemplateError::Exists(_)));
}

#[tokio::test]
async fn update_bumps_version_only_on_hash_change() {
    let repo = git_repo_with(&[("main.tf", "v1")]);
    let base = TempDir::new().unwrap();
    let registry = TemplateRegistry::load(&Roots::under(base.path())).unwrap();
    let url = repo.path().display().to_string();
    registry.add("t", &url, ".", None, None, Utc::now()).await.unwrap();

    assert_eq!(registry.update("t", Utc::now()).await.unwrap(), UpdateOutcome::Unchanged);
    assert_eq!(registry.get("t").unwrap().version, 1);

    std::fs::write(repo.path().join("main.tf"), "v2").unwrap();
    commit_all(repo.path(), "bump");
    match registry.update("t", Utc::now()).await.unwrap() {
        UpdateOutcome::Updated { old_hash, new_hash } => assert_ne!(old_hash, new_hash),
        other => panic!("expected update, got {other:?}"),
    }
    assert_eq!(registry.get("t").unwrap().version, 2);
}

#[tokio::test]
async fn remove_drops_metadata_and_tree() {
    let repo = git_repo_with(&[("main.tf", "x")]);
    let base = TempDir::new().unwrap();
    let registry = TemplateRegistry::load(&Roots::under(base.path())).unwrap();
    let url = repo.path().display().to_string();
    registry.add("gone", &url, ".", None, None, Utc::now()).await.unwrap();

    registry.remove("gone").unwrap();
    assert!(registry.get("gone").is_none());
    assert!(!registry.tree_dir("gone").exists());
    assert!(matches!(registry.remove("gone"), Err(TemplateError::NotFound(_))));
}

#[tokio::test]
async fn validate_reports_drift() {
    let repo = git_repo_with(&[("main.tf", "x")]);
    let base = TempDir::new().unwrap();
    let registry = TemplateRegistry::load(&Roots::under(base.path())).unwrap();
    let url = repo.path().display().to_string();
    registry.add("t", &url, ".", None, None, Utc::now()).await.unwrap();

    assert!(registry.validate("t").unwrap().is_clean());

    // Tamper with the stored tree.
    std::fs::write(registry.tree_dir("t").join("main.tf"), "tampered").unwrap();
    assert!(!registry.validate("t").unwrap().is_clean());
}

#[test]
fn unknown_template_not_found() {
    let base = TempDir::new().unwrap();
    let registry = TemplateRegistry::load(&Roots::under(base.path())).unwrap();
    assert!(matches!(registry.validate("ghost"), Err(TemplateError::NotFound(_))));
}
