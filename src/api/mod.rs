//! Service-level operations.
//!
//! [`Workbench`] exposes the operations callers drive the engine with:
//! execute a stored request, resolve text against an environment, and
//! activate or deactivate an environment. Inputs use the JSON shapes below,
//! ids are validated as UUIDs, and failures map onto [`ApiError`] with an
//! HTTP-style status code.

use crate::config::get_config;
use crate::environment::{Environment, EnvironmentStore};
use crate::error::StoreError;
use crate::executor::{ExecutionEngine, HttpTransport};
use crate::history::{HistoryLink, HistoryRecorder};
use crate::models::{ExecutionOverrides, ExecutionResult};
use crate::requests::RequestStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Body of an execute call.
///
/// `override*` fields win over their plain aliases when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequestBody {
    #[serde(default)]
    pub environment_id: Option<String>,
    #[serde(default)]
    pub override_url: Option<String>,
    #[serde(default)]
    pub override_headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub override_body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
}

impl ExecuteRequestBody {
    pub fn into_overrides(self) -> ExecutionOverrides {
        ExecutionOverrides {
            url: self.override_url.or(self.url),
            headers: self.override_headers.or(self.headers),
            body: self.override_body.or(self.body),
            environment_id: self.environment_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveBody {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub resolved_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateBody {
    #[serde(default)]
    pub workspace_id: Option<String>,
}

/// Failure of a service operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::Validation(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Unavailable(_) => ApiError::Internal(err.to_string()),
        }
    }
}

/// `{success, data, message}` response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn error(err: &ApiError) -> Self {
        Self {
            success: false,
            data: None,
            message: err.to_string(),
        }
    }

    /// Wraps an operation result, returning the status code alongside.
    pub fn respond(result: Result<T, ApiError>, message: impl Into<String>) -> (u16, Self) {
        match result {
            Ok(data) => (200, Self::ok(data, message)),
            Err(err) => (err.status_code(), Self::error(&err)),
        }
    }
}

/// Rejects ids that are not UUIDs.
pub fn validate_uuid(value: &str, field: &str) -> Result<(), ApiError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ApiError::Validation(format!("{} must be a valid UUID", field)))
}

/// Stores, engine and optional history behind the service operations.
#[derive(Clone)]
pub struct Workbench {
    requests: Arc<dyn RequestStore>,
    environments: Arc<dyn EnvironmentStore>,
    engine: ExecutionEngine,
    history: Option<Arc<dyn HistoryRecorder>>,
    record_history: bool,
}

impl std::fmt::Debug for Workbench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbench")
            .field("has_history", &self.history.is_some())
            .field("record_history", &self.record_history)
            .finish_non_exhaustive()
    }
}

impl Workbench {
    /// Creates a workbench; history recording follows the global config.
    pub fn new(
        requests: Arc<dyn RequestStore>,
        environments: Arc<dyn EnvironmentStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let engine = ExecutionEngine::new(requests.clone(), environments.clone(), transport);
        Self {
            requests,
            environments,
            engine,
            history: None,
            record_history: get_config().record_history,
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryRecorder>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_recording(mut self, record_history: bool) -> Self {
        self.record_history = record_history;
        self
    }

    pub fn requests(&self) -> &Arc<dyn RequestStore> {
        &self.requests
    }

    pub fn environments(&self) -> &Arc<dyn EnvironmentStore> {
        &self.environments
    }

    pub fn history(&self) -> Option<&Arc<dyn HistoryRecorder>> {
        self.history.as_ref()
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Executes a stored request and, if enabled, records it.
    ///
    /// A failure to record is logged and does not fail the execution.
    pub async fn execute_request(
        &self,
        request_id: &str,
        body: ExecuteRequestBody,
    ) -> Result<ExecutionResult, ApiError> {
        validate_uuid(request_id, "requestId")?;
        if let Some(env_id) = &body.environment_id {
            validate_uuid(env_id, "environmentId")?;
        }

        let result = self.engine.execute(request_id, body.into_overrides()).await?;

        if self.record_history {
            if let Some(history) = &self.history {
                let link = match self.requests.get_by_id(request_id) {
                    Ok(definition) => HistoryLink::from(&definition),
                    Err(_) => HistoryLink {
                        source_request_id: Some(result.request_id.clone()),
                        ..HistoryLink::default()
                    },
                };
                if let Err(e) = history.record(&result, &link) {
                    log::warn!("Failed to record history for {}: {}", request_id, e);
                }
            }
        }

        Ok(result)
    }

    /// Resolves `body.text` against the environment's variables.
    pub fn resolve_variables(
        &self,
        environment_id: &str,
        body: ResolveBody,
    ) -> Result<ResolveResponse, ApiError> {
        validate_uuid(environment_id, "environmentId")?;
        let text = body
            .text
            .ok_or_else(|| ApiError::Validation("Text to resolve is required".to_string()))?;

        let resolved_text = self.environments.resolve_text(environment_id, &text)?;
        Ok(ResolveResponse { resolved_text })
    }

    pub fn activate_environment(
        &self,
        environment_id: &str,
        body: ActivateBody,
    ) -> Result<Environment, ApiError> {
        validate_uuid(environment_id, "environmentId")?;
        if let Some(workspace_id) = &body.workspace_id {
            validate_uuid(workspace_id, "workspaceId")?;
        }

        Ok(self
            .environments
            .activate(environment_id, body.workspace_id.as_deref())?)
    }

    pub fn deactivate_environment(&self, environment_id: &str) -> Result<Environment, ApiError> {
        validate_uuid(environment_id, "environmentId")?;
        Ok(self.environments.deactivate(environment_id)?)
    }
}
