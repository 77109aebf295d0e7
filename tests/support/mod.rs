// ABOUTME: Test support utilities.
// ABOUTME: Provides the in-memory provider and a pipeline harness for integration tests.

use std::path::PathBuf;
use std::sync::Once;

use runway::config::{FileConfig, Settings, Vars};
use runway::output::{Output, OutputMode};
use runway::pipeline::{Overrides, Pipeline, PipelineError, RunReport};
use runway::state::StateStore;

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod fake_provider;

pub use fake_provider::{Call, FakeProvider};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("runway=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A state directory plus a fake provider, run like `runway up` would.
#[allow(dead_code)]
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub provider: FakeProvider,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            dir: tempfile::tempdir().unwrap(),
            provider: FakeProvider::new(),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join(".runway.env")
    }

    /// Current state file contents.
    pub fn store(&self) -> StateStore {
        StateStore::load(self.state_path()).unwrap()
    }

    pub fn state(&self, key: &str) -> Option<String> {
        self.store().get(key).map(str::to_string)
    }

    /// Run the pipeline with `tokens` as overrides. The process environment is not consulted.
    pub async fn run(&self, tokens: &[&str]) -> Result<RunReport, PipelineError> {
        let overrides = Overrides::parse(tokens).unwrap();
        let mut store = self.store();
        let mut vars = Vars::default()
            .with_state(&store)
            .with_overrides(overrides);
        let settings = Settings::resolve(&FileConfig::default(), &vars).unwrap();
        let output = Output::new(OutputMode::Quiet);

        Pipeline::from_settings(&settings)
            .run(&settings, &mut vars, &mut store, &self.provider, &output)
            .await
    }
}
