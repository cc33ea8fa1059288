//! Load-time validation: quarantine vs fatal errors.

use super::prelude::*;
use pv_core::Clock;

#[tokio::test]
async fn circular_dependency_fails_the_load() {
    let h = Harness::new(&[]);
    h.write_workspace("good", r#"{"deploy_schedule": "0 9 * * *"}"#, true);
    h.write_workspace(
        "zeta",
        r#"{"jobs": [
            {"name": "j1", "type": "command", "schedule": "@deployment", "command": "true", "depends_on": ["j2"]},
            {"name": "j2", "type": "command", "schedule": "@deployment", "command": "true", "depends_on": ["j1"]}
        ]}"#,
        true,
    );

    let err = h.load_registry().expect_err("load must fail");
    assert!(err.to_string().contains("circular dependency"), "got: {err}");
    assert!(err.to_string().contains("zeta"));
}

#[tokio::test]
async fn invalid_workspace_is_quarantined() {
    let h = Harness::new(&[]);
    h.write_workspace("good", r#"{"deploy_schedule": "0 9 * * *"}"#, true);
    h.write_workspace("broken", r#"{"deploy_schedule": "99 * * * *"}"#, true);

    let registry = h.load_registry().expect("load succeeds");
    assert!(registry.get("good").is_some());
    assert!(registry.get("broken").is_none());
    assert_eq!(registry.errors.len(), 1);
    assert_eq!(registry.errors[0].0, "broken");

    // The good workspace still schedules.
    h.clock.set_local(2026, 3, 4, 9, 30);
    let s = h.scheduler();
    tick_and_settle(&s).await;
    assert_eq!(h.deploy_calls(), 1);
}

#[tokio::test]
async fn stale_state_records_are_tolerated() {
    let h = Harness::new(&[]);
    // A record for a workspace that is not configured (operator removed it).
    h.engine.store.begin_deploy("ghost").expect("claim");
    h.engine
        .store
        .complete_deploy("ghost", None, h.clock.now_utc())
        .expect("complete");
    h.engine.persist();

    h.write_workspace("alpha", r#"{"deploy_schedule": "0 9 * * *"}"#, true);
    h.clock.set_local(2026, 3, 4, 10, 0);
    let s = h.scheduler();
    tick_and_settle(&s).await;

    // The ghost record is retained, untouched, and nothing was dispatched
    // for it.
    let reloaded =
        pv_storage::StateStore::load(&h.engine.roots.state_file()).expect("reload");
    assert_eq!(reloaded.workspace("ghost").status, pv_core::WorkspaceStatus::Deployed);
    assert_eq!(h.deploy_calls(), 1);
    assert_eq!(h.fake.calls()[0].workspace, "alpha");
}
