//! Mode-based scheduling and manual mode switches.

use super::prelude::*;
use pv_core::WorkspaceStatus;

const DELTA: &str = r#"{"template": "web-cluster",
    "mode_schedules": {"busy": "0 8 * * *", "hibernation": "0 20 * * *"}}"#;

#[tokio::test]
async fn manual_mode_switch_with_confirmation() {
    let h = Harness::new(&["web-cluster"]);
    h.write_workspace("delta", DELTA, false);
    let ops = h.ops();

    ops.deploy("delta", Some("busy")).await.expect("initial deploy");
    assert_eq!(h.engine.store.workspace("delta").deployment_mode.as_deref(), Some("busy"));

    // Operator switches modes; confirmation accepted.
    let confirmed = std::sync::atomic::AtomicBool::new(false);
    ops.mode("delta", "hibernation", |current, requested| {
        assert_eq!(current, "busy");
        assert_eq!(requested, "hibernation");
        confirmed.store(true, std::sync::atomic::Ordering::SeqCst);
        true
    })
    .await
    .expect("mode switch");
    assert!(confirmed.load(std::sync::atomic::Ordering::SeqCst));

    let record = h.engine.store.workspace("delta");
    assert_eq!(record.status, WorkspaceStatus::Deployed);
    assert_eq!(record.deployment_mode.as_deref(), Some("hibernation"));

    // The client saw the mode as a variable, and no intermediate destroy.
    let calls = h.fake.calls();
    assert_eq!(calls.last().expect("calls").mode.as_deref(), Some("hibernation"));
    assert_eq!(h.destroy_calls(), 0);
}

#[tokio::test]
async fn scheduled_mode_transitions_follow_the_latest_slot() {
    let h = Harness::new(&["web-cluster"]);
    h.write_workspace("delta", DELTA, false);
    h.clock.set_local(2026, 3, 4, 8, 10);

    let s = h.scheduler();
    tick_and_settle(&s).await;
    assert_eq!(h.engine.store.workspace("delta").deployment_mode.as_deref(), Some("busy"));

    h.clock.set_local(2026, 3, 4, 20, 10);
    tick_and_settle(&s).await;
    let record = h.engine.store.workspace("delta");
    assert_eq!(record.deployment_mode.as_deref(), Some("hibernation"));
    assert_eq!(h.deploy_calls(), 2);
    assert_eq!(h.destroy_calls(), 0);

    // Covered slots do not re-fire.
    h.clock.set_local(2026, 3, 4, 22, 0);
    tick_and_settle(&s).await;
    assert_eq!(h.deploy_calls(), 2);
}
