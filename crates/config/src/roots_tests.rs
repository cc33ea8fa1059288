// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn dev_defaults_are_relative() {
    std::env::remove_var(CONFIG_DIR_ENV);
    std::env::remove_var(STATE_DIR_ENV);
    std::env::remove_var(LOG_DIR_ENV);
    let roots = Roots::resolve(true);
    assert_eq!(roots.config_dir, PathBuf::from("."));
    assert_eq!(roots.state_dir, PathBuf::from("./state"));
    assert_eq!(roots.log_dir, PathBuf::from("./logs"));
}

#[test]
#[serial]
fn installed_defaults_are_system_paths() {
    std::env::remove_var(CONFIG_DIR_ENV);
    std::env::remove_var(STATE_DIR_ENV);
    std::env::remove_var(LOG_DIR_ENV);
    let roots = Roots::resolve(false);
    assert_eq!(roots.config_dir, PathBuf::from("/etc/provisioner"));
    assert_eq!(roots.state_dir, PathBuf::from("/var/lib/provisioner"));
    assert_eq!(roots.log_dir, PathBuf::from("/var/log/provisioner"));
}

#[test]
#[serial]
fn env_vars_override_each_root() {
    std::env::set_var(CONFIG_DIR_ENV, "/tmp/pv-config");
    std::env::set_var(STATE_DIR_ENV, "/tmp/pv-state");
    std::env::remove_var(LOG_DIR_ENV);
    let roots = Roots::resolve(false);
    assert_eq!(roots.config_dir, PathBuf::from("/tmp/pv-config"));
    assert_eq!(roots.state_dir, PathBuf::from("/tmp/pv-state"));
    assert_eq!(roots.log_dir, PathBuf::from("/var/log/provisioner"));
    std::env::remove_var(CONFIG_DIR_ENV);
    std::env::remove_var(STATE_DIR_ENV);
}

#[test]
fn derived_paths_hang_off_roots() {
    let roots = Roots::under(Path::new("/base"));
    assert_eq!(roots.workspaces_dir(), PathBuf::from("/base/workspaces"));
    assert_eq!(roots.state_file(), PathBuf::from("/base/state/scheduler-state.json"));
    assert_eq!(roots.template_registry_file(), PathBuf::from("/base/state/templates/registry.json"));
    assert_eq!(roots.deployment_dir("alpha"), PathBuf::from("/base/state/deployments/alpha"));
    assert_eq!(roots.workspace_log("alpha"), PathBuf::from("/base/logs/alpha.log"));
}
