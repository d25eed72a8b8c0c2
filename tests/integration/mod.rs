//! Integration tests for the workbench.
//!
//! Shared fixtures wire real in-memory stores to a `ReqwestTransport` so
//! requests go over the network to a local `wiremock` server.

pub mod environment_test;
pub mod execution_test;
pub mod history_test;
pub mod resolver_properties_test;

use rest_workbench::executor::{ExecutionConfig, ReqwestTransport};
use rest_workbench::{
    InMemoryEnvironmentStore, InMemoryRequestStore, RequestDefinition, RequestStore, Workbench,
};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize test environment (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Stores and a workbench dispatching over real HTTP.
pub struct Fixture {
    pub requests: Arc<InMemoryRequestStore>,
    pub environments: Arc<InMemoryEnvironmentStore>,
    pub workbench: Workbench,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_environments(InMemoryEnvironmentStore::new())
    }

    pub fn with_environments(environments: InMemoryEnvironmentStore) -> Self {
        init_test_env();
        let requests = Arc::new(InMemoryRequestStore::new());
        let environments = Arc::new(environments);
        let transport = ReqwestTransport::new(&ExecutionConfig::new(5_000))
            .expect("Failed to build transport");
        let workbench = Workbench::new(requests.clone(), environments.clone(), Arc::new(transport))
            .with_recording(false);
        Self {
            requests,
            environments,
            workbench,
        }
    }

    /// Stores `definition` and returns its id.
    pub fn store(&self, definition: RequestDefinition) -> String {
        self.requests
            .insert(definition)
            .expect("Failed to store request")
            .id
    }
}
