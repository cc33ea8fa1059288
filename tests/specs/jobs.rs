//! Event-triggered job chains.

use super::prelude::*;
use pv_core::JobStatus;

#[tokio::test]
async fn deployment_event_runs_chain_in_order() {
    let h = Harness::new(&[]);
    let log = h.tmp.path().join("chain-order");
    let job = |name: &str, deps: &str, schedule: &str| {
        format!(
            r#"{{"name": "{name}", "type": "command", "schedule": "{schedule}",
                "command": "echo {name} >> {}", "depends_on": [{deps}]}}"#,
            log.display()
        )
    };
    h.write_workspace(
        "epsilon",
        &format!(
            r#"{{"jobs": [{}, {}, {}, {}]}}"#,
            job("a", "", "@deployment"),
            job("b", "\"a\"", "@deployment"),
            job("c", "\"b\"", "@deployment"),
            job("d", "", "0 2 * * *"),
        ),
        true,
    );

    let ops = h.ops();
    ops.deploy("epsilon", None).await.expect("manual deploy");
    h.engine.deployer.settle_events().await;

    // A, then B, then C ran; the time-scheduled D did not.
    let text = std::fs::read_to_string(&log).expect("chain log");
    assert_eq!(text.split_whitespace().collect::<Vec<_>>(), ["a", "b", "c"]);
    assert_eq!(h.engine.job_states.get("epsilon/d").run_count, 0);
    for name in ["a", "b", "c"] {
        assert_eq!(
            h.engine.job_states.get(&format!("epsilon/{name}")).status,
            JobStatus::Success
        );
    }
}

#[tokio::test]
async fn failure_event_chain_runs_on_failed_deploy() {
    let h = Harness::new(&[]);
    let marker = h.tmp.path().join("alerted");
    h.write_workspace(
        "beta",
        &format!(
            r#"{{"jobs": [{{"name": "alert", "type": "command",
                "schedule": "@deployment-failed", "command": "touch {}"}}]}}"#,
            marker.display()
        ),
        true,
    );
    h.fake.fail_deploys("beta", "no capacity");

    let ops = h.ops();
    let _ = ops.deploy("beta", None).await;
    h.engine.deployer.settle_events().await;

    assert!(marker.exists());
}

#[tokio::test]
async fn reboot_jobs_fire_once_at_startup() {
    let h = Harness::new(&[]);
    let marker = h.tmp.path().join("warmed-up");
    let jobs_dir = h.tmp.path().join("jobs");
    std::fs::create_dir_all(&jobs_dir).expect("jobs dir");
    std::fs::write(
        jobs_dir.join("warmup.json"),
        format!(
            r#"{{"name": "warmup", "type": "command", "schedule": "@reboot",
                "command": "touch {}"}}"#,
            marker.display()
        ),
    )
    .expect("job file");

    // Daemon startup order: load registry, seed the job engine, emit reboot.
    let _s = h.scheduler();
    h.engine.deployer.emit_reboot();
    h.engine.deployer.settle_events().await;

    assert!(marker.exists());
    assert_eq!(h.engine.job_states.get("standalone/warmup").success_count, 1);
}
