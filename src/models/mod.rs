//! Data models for stored requests, responses and execution results.

pub mod execution;
pub mod request;
pub mod response;

pub use execution::{ExecutionOutcome, ExecutionOverrides, ExecutionResult, FailureKind};
pub use request::{AuthType, BodyType, HttpMethod, RequestDefinition};
pub use response::HttpResponse;
