//! Shared harness for the scenario tests.

use chrono::Utc;
use pv_adapters::{FakeProvisioner, ProvisionerClient};
use pv_config::{Roots, WorkspaceRegistry};
use pv_core::FakeClock;
use pv_engine::{Engine, Operations, Scheduler, TemplateMeta};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub struct Harness {
    pub tmp: TempDir,
    pub engine: Arc<Engine<FakeClock>>,
    pub fake: Arc<FakeProvisioner>,
    pub clock: FakeClock,
}

impl Harness {
    /// Fresh roots under a tempdir; `templates` are seeded before the
    /// engine opens so its registry sees them.
    pub fn new(templates: &[&str]) -> Self {
        let tmp = TempDir::new().expect("tempdir");
        for name in templates {
            seed_template(tmp.path(), name);
        }
        let roots = Roots::under(tmp.path());
        let fake = Arc::new(FakeProvisioner::new());
        let client: Arc<dyn ProvisionerClient> = fake.clone() as Arc<dyn ProvisionerClient>;
        let clock = FakeClock::new();
        let engine =
            Arc::new(Engine::open(roots, client, clock.clone()).expect("engine open"));
        Harness { tmp, engine, fake, clock }
    }

    pub fn write_workspace(&self, name: &str, config: &str, with_tf: bool) {
        let dir = self.tmp.path().join("workspaces").join(name);
        std::fs::create_dir_all(&dir).expect("workspace dir");
        std::fs::write(dir.join("config.json"), config).expect("config.json");
        if with_tf {
            std::fs::write(dir.join("main.tf"), "resource {}").expect("main.tf");
        }
    }

    pub fn load_registry(&self) -> Result<WorkspaceRegistry, pv_config::ConfigError> {
        WorkspaceRegistry::load(&self.engine.roots)
    }

    pub fn scheduler(&self) -> Arc<Scheduler<FakeClock>> {
        let registry = self.load_registry().expect("registry load");
        Scheduler::new(Arc::clone(&self.engine), registry)
    }

    pub fn ops(&self) -> Operations<FakeClock> {
        Operations::new(Arc::clone(&self.engine))
    }

    pub fn deploy_calls(&self) -> usize {
        self.fake.calls().iter().filter(|c| c.operation == "deploy").count()
    }

    pub fn destroy_calls(&self) -> usize {
        self.fake.calls().iter().filter(|c| c.operation == "destroy").count()
    }
}

pub async fn tick_and_settle(s: &Arc<Scheduler<FakeClock>>) {
    s.tick().await;
    s.settle().await;
}

fn seed_template(base: &Path, name: &str) {
    let roots = Roots::under(base);
    let tree = roots.template_tree_dir(name);
    std::fs::create_dir_all(&tree).expect("template tree");
    std::fs::write(tree.join("main.tf"), "template source").expect("template file");
    let hash = pv_adapters::hash_tree(&tree).expect("hash");
    let meta = TemplateMeta {
        name: name.to_string(),
        source_url: "file:///seed".to_string(),
        source_path: ".".to_string(),
        source_ref: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        content_hash: hash,
        description: None,
        version: 1,
    };
    let file = serde_json::json!({"templates": {name: meta}});
    std::fs::write(roots.template_registry_file(), file.to_string()).expect("registry file");
}
