//! Execution inputs and results.

use super::request::HttpMethod;
use super::response::HttpResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller-supplied values that replace or extend the stored request.
///
/// `url` and `body` replace the stored value outright when present.
/// `headers` are merged over the stored headers, override keys winning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOverrides {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub environment_id: Option<String>,
}

impl ExecutionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_environment(mut self, environment_id: impl Into<String>) -> Self {
        self.environment_id = Some(environment_id.into());
        self
    }
}

/// Category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Network,
    Timeout,
    InvalidUrl,
    Tls,
    Build,
    UnsupportedProtocol,
}

/// What happened when the request was dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExecutionOutcome {
    /// A response was received, whatever its status code.
    Completed(HttpResponse),
    /// The call could not complete (DNS, refused connection, timeout, ...).
    Failed { kind: FailureKind, message: String },
}

/// Structured record of one execution.
///
/// Carries both the resolved request facts and the response facts. Failed
/// dispatches produce a result too, so callers can store and display them
/// the same way as successful ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub request_id: String,
    pub method: HttpMethod,
    /// URL after overrides and variable resolution.
    pub url: String,
    /// Headers after merging and variable resolution.
    pub headers: HashMap<String, String>,
    pub request_body: Option<String>,
    /// Environment whose variables were applied, if any.
    pub environment_id: Option<String>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub outcome: ExecutionOutcome,
}

impl ExecutionResult {
    pub fn response(&self) -> Option<&HttpResponse> {
        match &self.outcome {
            ExecutionOutcome::Completed(response) => Some(response),
            ExecutionOutcome::Failed { .. } => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.response().map(|r| r.status_code)
    }

    pub fn response_body(&self) -> Option<&str> {
        self.response().map(|r| r.body.as_str())
    }

    pub fn response_headers(&self) -> Option<&HashMap<String, String>> {
        self.response().map(|r| &r.headers)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Failed { .. })
    }

    /// Failure message for failed dispatches.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ExecutionOutcome::Failed { message, .. } => Some(message.as_str()),
            ExecutionOutcome::Completed(_) => None,
        }
    }
}
