// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;
use tempfile::TempDir;

fn write_workspace(root: &Path, name: &str, config: &str) {
    let dir = root.join("workspaces").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.json"), config).unwrap();
}

fn roots(tmp: &TempDir) -> Roots {
    Roots::under(tmp.path())
}

#[test]
fn loads_valid_workspaces() {
    let tmp = TempDir::new().unwrap();
    write_workspace(tmp.path(), "alpha", r#"{"deploy_schedule": "0 9 * * *"}"#);
    write_workspace(tmp.path(), "beta", r#"{"enabled": false}"#);

    let registry = WorkspaceRegistry::load(&roots(&tmp)).unwrap();
    assert_eq!(registry.workspaces.len(), 2);
    assert!(registry.errors.is_empty());
    assert!(registry.get("alpha").unwrap().enabled);
    assert!(!registry.get("beta").unwrap().enabled);
}

#[test]
fn invalid_workspace_quarantined_not_fatal() {
    let tmp = TempDir::new().unwrap();
    write_workspace(tmp.path(), "good", r#"{"deploy_schedule": "0 9 * * *"}"#);
    write_workspace(tmp.path(), "bad", r#"{"deploy_schedule": "not a cron"}"#);

    let registry = WorkspaceRegistry::load(&roots(&tmp)).unwrap();
    assert_eq!(registry.workspaces.len(), 1);
    assert_eq!(registry.errors.len(), 1);
    assert_eq!(registry.errors[0].0, "bad");
}

#[test]
fn missing_config_json_quarantines() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("workspaces/empty")).unwrap();
    let registry = WorkspaceRegistry::load(&roots(&tmp)).unwrap();
    assert!(registry.workspaces.is_empty());
    assert_eq!(registry.errors.len(), 1);
}

#[test]
fn job_cycle_fails_whole_load() {
    let tmp = TempDir::new().unwrap();
    write_workspace(tmp.path(), "good", r#"{"deploy_schedule": "0 9 * * *"}"#);
    write_workspace(
        tmp.path(),
        "zeta",
        r#"{"jobs": [
            {"name": "j1", "type": "command", "schedule": "@deployment", "command": "true", "depends_on": ["j2"]},
            {"name": "j2", "type": "command", "schedule": "@deployment", "command": "true", "depends_on": ["j1"]}
        ]}"#,
    );

    let err = WorkspaceRegistry::load(&roots(&tmp)).unwrap_err();
    assert!(err.to_string().contains("circular dependency"));
}

#[test]
fn local_tf_source_detected() {
    let tmp = TempDir::new().unwrap();
    write_workspace(tmp.path(), "local", r#"{"template": "ignored"}"#);
    fs::write(tmp.path().join("workspaces/local/main.tf"), "# empty").unwrap();

    let registry = WorkspaceRegistry::load(&roots(&tmp)).unwrap();
    assert!(registry.get("local").unwrap().has_local_source);
}

#[test]
fn standalone_jobs_load_from_jobs_dir() {
    let tmp = TempDir::new().unwrap();
    let jobs_dir = tmp.path().join("jobs");
    fs::create_dir_all(&jobs_dir).unwrap();
    fs::write(
        jobs_dir.join("cleanup.json"),
        r#"{"name": "cleanup", "type": "command", "schedule": "0 4 * * *", "command": "true"}"#,
    )
    .unwrap();

    let registry = WorkspaceRegistry::load(&roots(&tmp)).unwrap();
    assert_eq!(registry.standalone_jobs.len(), 1);
    assert_eq!(registry.standalone_jobs[0].scope, STANDALONE_SCOPE);
    assert_eq!(registry.jobs_in_scope(STANDALONE_SCOPE).len(), 1);
}

#[test]
fn invalid_standalone_job_graph_quarantined_not_fatal() {
    let tmp = TempDir::new().unwrap();
    write_workspace(tmp.path(), "good", r#"{"deploy_schedule": "0 9 * * *"}"#);
    let jobs_dir = tmp.path().join("jobs");
    fs::create_dir_all(&jobs_dir).unwrap();
    // Two files claiming the same job name.
    fs::write(
        jobs_dir.join("first.json"),
        r#"{"name": "dup", "type": "command", "schedule": "0 4 * * *", "command": "true"}"#,
    )
    .unwrap();
    fs::write(
        jobs_dir.join("second.json"),
        r#"{"name": "dup", "type": "command", "schedule": "0 5 * * *", "command": "true"}"#,
    )
    .unwrap();

    let registry = WorkspaceRegistry::load(&roots(&tmp)).unwrap();
    assert!(registry.get("good").is_some());
    assert!(registry.standalone_jobs.is_empty());
    assert_eq!(registry.errors.len(), 1);
    assert!(registry.errors[0].1.contains("duplicate job name"));
}

#[test]
fn unknown_standalone_dependency_quarantined_not_fatal() {
    let tmp = TempDir::new().unwrap();
    write_workspace(tmp.path(), "good", r#"{"deploy_schedule": "0 9 * * *"}"#);
    let jobs_dir = tmp.path().join("jobs");
    fs::create_dir_all(&jobs_dir).unwrap();
    fs::write(
        jobs_dir.join("orphan.json"),
        r#"{"name": "orphan", "type": "command", "schedule": "@reboot",
            "command": "true", "depends_on": ["ghost"]}"#,
    )
    .unwrap();

    let registry = WorkspaceRegistry::load(&roots(&tmp)).unwrap();
    assert!(registry.get("good").is_some());
    assert!(registry.standalone_jobs.is_empty());
    assert_eq!(registry.errors.len(), 1);
    assert!(registry.errors[0].1.contains("ghost"));
}

#[test]
fn standalone_job_cycle_fails_whole_load() {
    let tmp = TempDir::new().unwrap();
    write_workspace(tmp.path(), "good", r#"{"deploy_schedule": "0 9 * * *"}"#);
    let jobs_dir = tmp.path().join("jobs");
    fs::create_dir_all(&jobs_dir).unwrap();
    fs::write(
        jobs_dir.join("j1.json"),
        r#"{"name": "j1", "type": "command", "schedule": "@reboot",
            "command": "true", "depends_on": ["j2"]}"#,
    )
    .unwrap();
    fs::write(
        jobs_dir.join("j2.json"),
        r#"{"name": "j2", "type": "command", "schedule": "@reboot",
            "command": "true", "depends_on": ["j1"]}"#,
    )
    .unwrap();

    let err = WorkspaceRegistry::load(&roots(&tmp)).unwrap_err();
    assert!(err.to_string().contains("circular dependency"));
}

#[test]
fn tree_changed_since_sees_touched_config() {
    let tmp = TempDir::new().unwrap();
    write_workspace(tmp.path(), "alpha", r#"{"deploy_schedule": "0 9 * * *"}"#);
    let registry = WorkspaceRegistry::load(&roots(&tmp)).unwrap();

    assert!(!WorkspaceRegistry::tree_changed_since(&roots(&tmp), registry.scanned_at()));

    // Backdate the scan to simulate a later touch.
    let past = registry.scanned_at() - std::time::Duration::from_secs(60);
    assert!(WorkspaceRegistry::tree_changed_since(&roots(&tmp), past));
}

#[test]
fn empty_config_root_loads_empty() {
    let tmp = TempDir::new().unwrap();
    let registry = WorkspaceRegistry::load(&roots(&tmp)).unwrap();
    assert!(registry.workspaces.is_empty());
    assert!(registry.standalone_jobs.is_empty());
}
