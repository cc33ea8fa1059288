//! Scheduler scenarios: catch-up, sticky failure, permanent workspaces.

use super::prelude::*;
use pv_core::{Clock, WorkspaceStatus};

// 2026-03-04 is a Wednesday; 2026-03-02 is a Monday.

#[tokio::test]
async fn catch_up_deploy_after_downtime() {
    let h = Harness::new(&[]);
    h.write_workspace("alpha", r#"{"deploy_schedule": "0 9 * * *"}"#, true);
    // The daemon was down over the 09:00 slot and starts at 10:15.
    h.clock.set_local(2026, 3, 4, 10, 15);

    let s = h.scheduler();
    tick_and_settle(&s).await;

    let record = h.engine.store.workspace("alpha");
    assert_eq!(record.status, WorkspaceStatus::Deployed);
    let nine_utc = h.clock.now_utc() - chrono::Duration::minutes(75);
    assert!(record.last_deployed.expect("deployed timestamp") >= nine_utc);

    // The same slot is never honored twice.
    h.clock.advance(chrono::Duration::minutes(2));
    tick_and_settle(&s).await;
    assert_eq!(h.deploy_calls(), 1);
}

#[tokio::test]
async fn sticky_deploy_failure_until_operator_touch() {
    let h = Harness::new(&[]);
    h.write_workspace("beta", r#"{"deploy_schedule": "*/5 * * * *"}"#, true);
    h.fake.fail_deploys("beta", "Error: quota exceeded");
    h.clock.set_local(2026, 3, 4, 12, 0);

    let s = h.scheduler();
    tick_and_settle(&s).await;
    assert_eq!(h.engine.store.workspace("beta").status, WorkspaceStatus::DeployFailed);
    assert_eq!(h.deploy_calls(), 1);

    // Slots at 12:05..12:30 come and go; nothing is retried.
    for minute in [7u32, 13, 21, 28] {
        h.clock.set_local(2026, 3, 4, 12, minute);
        tick_and_settle(&s).await;
    }
    assert_eq!(h.deploy_calls(), 1);

    // 12:31: the operator fixes the workspace and touches config.json.
    h.fake.clear_deploy_failure("beta");
    h.write_workspace("beta", r#"{"deploy_schedule": "*/5 * * * *"}"#, true);
    h.clock.set_local(2026, 3, 4, 12, 31);
    tick_and_settle(&s).await;

    let record = h.engine.store.workspace("beta");
    assert_eq!(record.status, WorkspaceStatus::Deployed);
    assert_eq!(record.last_deploy_error, None);
    // The 12:30 slot was still unhonored, so the deploy fired immediately.
    assert_eq!(h.deploy_calls(), 2);
}

#[tokio::test]
async fn permanent_workspace_stays_deployed() {
    let h = Harness::new(&[]);
    h.write_workspace(
        "gamma",
        r#"{"deploy_schedule": "0 6 * * 1", "destroy_schedule": false}"#,
        true,
    );
    // Monday 06:30.
    h.clock.set_local(2026, 3, 2, 6, 30);
    let s = h.scheduler();
    tick_and_settle(&s).await;
    assert_eq!(h.engine.store.workspace("gamma").status, WorkspaceStatus::Deployed);

    // Days go by; no destroy is ever dispatched.
    for (day, hour) in [(2, 23), (3, 12), (4, 3), (5, 18)] {
        h.clock.set_local(2026, 3, day, hour, 45);
        tick_and_settle(&s).await;
    }
    assert_eq!(h.engine.store.workspace("gamma").status, WorkspaceStatus::Deployed);
    assert_eq!(h.destroy_calls(), 0);
}

#[tokio::test]
async fn state_store_round_trips_across_restart() {
    let h = Harness::new(&[]);
    h.write_workspace("alpha", r#"{"deploy_schedule": "0 9 * * *"}"#, true);
    h.clock.set_local(2026, 3, 4, 9, 30);
    let s = h.scheduler();
    tick_and_settle(&s).await;
    let before = h.engine.store.workspace("alpha");
    assert_eq!(before.status, WorkspaceStatus::Deployed);

    // Reload the state file the way a restarted daemon would.
    let reloaded =
        pv_storage::StateStore::load(&h.engine.roots.state_file()).expect("state reload");
    assert_eq!(reloaded.workspace("alpha"), before);
    assert_eq!(reloaded.workspace("never-seen").status, WorkspaceStatus::Destroyed);
}

#[tokio::test]
async fn restart_does_not_redeploy_honored_slot() {
    let h = Harness::new(&[]);
    h.write_workspace("alpha", r#"{"deploy_schedule": "0 9 * * *"}"#, true);
    h.clock.set_local(2026, 3, 4, 9, 5);
    let s = h.scheduler();
    tick_and_settle(&s).await;
    assert_eq!(h.deploy_calls(), 1);

    // Simulate a restart later the same day: fresh scheduler, same stores.
    h.clock.set_local(2026, 3, 4, 14, 0);
    let restarted = h.scheduler();
    tick_and_settle(&restarted).await;
    assert_eq!(h.deploy_calls(), 1, "09:00 slot was already honored");
}
