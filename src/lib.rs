//! REST Workbench core
//!
//! Request execution and variable resolution for an API testing workbench.
//! Stored request definitions are executed against the network with
//! `{{variable}}` placeholders filled in from the selected environment, and
//! each execution can be recorded in a request history.
//!
//! # Architecture
//!
//! - **models**: Request definitions, responses and execution results
//! - **variables**: Placeholder substitution
//! - **environment**: Environment store with one active environment per workspace
//! - **requests**: Request definition store
//! - **auth**: Stored authentication settings applied at dispatch time
//! - **executor**: The execution engine and its HTTP transport
//! - **history**: Recorded executions, in memory or as a JSONL file
//! - **config**: Global configuration
//! - **api**: Service operations with validated inputs and response envelopes
//! - **snapshot**: JSON state file used by the `workbench` binary
//!
//! # Usage
//!
//! ```ignore
//! use rest_workbench::{ExecutionEngine, ExecutionOverrides};
//!
//! let engine = ExecutionEngine::with_default_transport(requests, environments)?;
//! let result = engine.execute(&request_id, ExecutionOverrides::new()).await?;
//! println!("{:?} in {}ms", result.status_code(), result.duration_ms);
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod history;
pub mod models;
pub mod requests;
pub mod snapshot;
pub mod variables;

pub use api::{ApiEnvelope, ApiError, Workbench};
pub use environment::{Environment, EnvironmentStore, InMemoryEnvironmentStore, NewEnvironment};
pub use error::{EntityKind, StoreError};
pub use executor::{ExecutionConfig, ExecutionEngine, HttpTransport, ReqwestTransport};
pub use history::{HistoryRecorder, InMemoryHistory, JsonlHistoryStore, RequestHistoryEntry};
pub use models::{
    ExecutionOutcome, ExecutionOverrides, ExecutionResult, HttpMethod, HttpResponse,
    RequestDefinition,
};
pub use requests::{InMemoryRequestStore, RequestStore};
