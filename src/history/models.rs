//! Data models for request history.

use crate::error::{EntityKind, StoreError};
use crate::models::{BodyType, ExecutionOutcome, ExecutionResult, HttpMethod, RequestDefinition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Maximum response body size to store in history (1MB).
///
/// Larger bodies are dropped from the stored entry.
pub const MAX_RESPONSE_BODY_SIZE: usize = 1_048_576;

/// Placeholder stored instead of a sensitive header value.
pub const REDACTED: &str = "[REDACTED]";

/// Header names whose values are redacted before storage.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "api-key",
    "auth-token",
    "x-auth-token",
    "access-token",
    "x-access-token",
    "proxy-authorization",
];

/// Returns `true` if `name` is one of [`SENSITIVE_HEADERS`], ignoring case.
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|sensitive| name.eq_ignore_ascii_case(sensitive))
}

/// One recorded execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHistoryEntry {
    pub id: String,

    /// Stored request the execution came from.
    #[serde(default)]
    pub source_request_id: Option<String>,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,

    pub method: HttpMethod,

    /// Resolved URL that was sent.
    pub url: String,

    #[serde(default)]
    pub request_headers: HashMap<String, String>,
    #[serde(default)]
    pub request_body_type: Option<BodyType>,
    #[serde(default)]
    pub request_body_content: Option<String>,

    /// Absent when the request failed before a response arrived.
    #[serde(default)]
    pub response_status_code: Option<u16>,
    #[serde(default)]
    pub response_headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub response_body: Option<String>,

    /// Failure message for executions that produced no response.
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub duration_ms: u64,

    pub executed_at: DateTime<Utc>,
}

impl RequestHistoryEntry {
    /// Builds an entry from an execution result and its links.
    pub fn from_execution(result: &ExecutionResult, link: &HistoryLink) -> Self {
        let (status, headers, body, error) = match &result.outcome {
            ExecutionOutcome::Completed(response) => (
                Some(response.status_code),
                Some(response.headers.clone()),
                Some(response.body.clone()),
                None,
            ),
            ExecutionOutcome::Failed { message, .. } => (None, None, None, Some(message.clone())),
        };

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_request_id: link
                .source_request_id
                .clone()
                .or_else(|| Some(result.request_id.clone())),
            collection_id: link.collection_id.clone(),
            workspace_id: link.workspace_id.clone(),
            method: result.method,
            url: result.url.clone(),
            request_headers: result.headers.clone(),
            request_body_type: link.body_type,
            request_body_content: result.request_body.clone(),
            response_status_code: status,
            response_headers: headers,
            response_body: body,
            error,
            duration_ms: result.duration_ms,
            executed_at: result.timestamp,
        }
    }

    /// `true` when a 2xx response was recorded.
    pub fn is_success(&self) -> bool {
        matches!(self.response_status_code, Some(code) if (200..300).contains(&code))
    }

    /// `true` for failed dispatches and 4xx/5xx responses.
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.response_status_code.map_or(false, |code| code >= 400)
    }

    pub fn has_large_response(&self) -> bool {
        self.response_body
            .as_ref()
            .map_or(false, |body| body.len() > MAX_RESPONSE_BODY_SIZE)
    }

    /// Redacts sensitive request and response header values.
    pub fn sanitize_headers(mut self) -> Self {
        redact(&mut self.request_headers);
        if let Some(headers) = self.response_headers.as_mut() {
            redact(headers);
        }
        self
    }

    /// Drops the response body if it exceeds [`MAX_RESPONSE_BODY_SIZE`].
    pub fn truncate_large_response(mut self) -> Self {
        if self.has_large_response() {
            self.response_body = None;
        }
        self
    }

    /// Applies the storage policy: optional header redaction and the body
    /// size limit.
    pub fn prepare_for_storage(self, sanitize_sensitive: bool) -> Self {
        let entry = if sanitize_sensitive {
            self.sanitize_headers()
        } else {
            self
        };
        entry.truncate_large_response()
    }

    /// Applies a correction in place.
    pub fn apply(&mut self, correction: HistoryCorrection) -> Result<(), HistoryError> {
        correction.validate()?;

        let HistoryCorrection {
            source_request_id,
            collection_id,
            workspace_id,
            method,
            url,
            request_headers,
            request_body_type,
            request_body_content,
            response_status_code,
            response_headers,
            response_body,
            duration_ms,
        } = correction;

        if source_request_id.is_some() {
            self.source_request_id = source_request_id;
        }
        if collection_id.is_some() {
            self.collection_id = collection_id;
        }
        if workspace_id.is_some() {
            self.workspace_id = workspace_id;
        }
        if let Some(method) = method {
            self.method = method;
        }
        if let Some(url) = url {
            self.url = url;
        }
        if let Some(headers) = request_headers {
            self.request_headers = headers;
        }
        if request_body_type.is_some() {
            self.request_body_type = request_body_type;
        }
        if request_body_content.is_some() {
            self.request_body_content = request_body_content;
        }
        if response_status_code.is_some() {
            self.response_status_code = response_status_code;
        }
        if response_headers.is_some() {
            self.response_headers = response_headers;
        }
        if response_body.is_some() {
            self.response_body = response_body;
        }
        if let Some(duration_ms) = duration_ms {
            self.duration_ms = duration_ms;
        }
        Ok(())
    }
}

fn redact(headers: &mut HashMap<String, String>) {
    for (name, value) in headers.iter_mut() {
        if is_sensitive_header(name) {
            *value = REDACTED.to_string();
        }
    }
}

/// Where a recorded execution came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLink {
    pub source_request_id: Option<String>,
    pub collection_id: Option<String>,
    pub workspace_id: Option<String>,
    pub body_type: Option<BodyType>,
}

impl From<&RequestDefinition> for HistoryLink {
    fn from(definition: &RequestDefinition) -> Self {
        Self {
            source_request_id: Some(definition.id.clone()),
            collection_id: definition.collection_id.clone(),
            workspace_id: definition.workspace_id.clone(),
            body_type: match definition.body_type {
                BodyType::None => None,
                other => Some(other),
            },
        }
    }
}

/// Partial correction of a stored entry. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCorrection {
    #[serde(default)]
    pub source_request_id: Option<String>,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub method: Option<HttpMethod>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub request_headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub request_body_type: Option<BodyType>,
    #[serde(default)]
    pub request_body_content: Option<String>,
    #[serde(default)]
    pub response_status_code: Option<u16>,
    #[serde(default)]
    pub response_headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub response_body: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl HistoryCorrection {
    pub fn validate(&self) -> Result<(), HistoryError> {
        if let Some(code) = self.response_status_code {
            if !(100..=599).contains(&code) {
                return Err(HistoryError::Invalid(format!(
                    "response status code {} is outside 100-599",
                    code
                )));
            }
        }
        if let Some(url) = &self.url {
            if url.trim().is_empty() {
                return Err(HistoryError::Invalid("url must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Errors that can occur during history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History storage error: {0}")]
    StorageError(#[from] std::io::Error),

    #[error("History serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Request history not found: {0}")]
    NotFound(String),

    #[error("Invalid history entry: {0}")]
    Invalid(String),

    #[error("History store unavailable: {0}")]
    Unavailable(String),
}

impl HistoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HistoryError::NotFound(_))
    }
}

impl From<HistoryError> for StoreError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::NotFound(id) => StoreError::not_found(EntityKind::History, id),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}
