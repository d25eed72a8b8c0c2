//! Request execution.
//!
//! [`ExecutionEngine::execute`] loads a stored request definition, applies
//! caller overrides, picks an environment, resolves `{{variable}}`
//! placeholders, adds stored auth and query parameters, dispatches the
//! request and returns a structured [`ExecutionResult`].
//!
//! Only a missing request definition is an error. Missing environments,
//! unresolvable placeholders and transport failures are logged or folded
//! into the result so the caller always gets something to display and store.

pub mod config;
pub mod error;
pub mod transport;

pub use config::ExecutionConfig;
pub use error::RequestError;
pub use transport::{validate_url, HttpTransport, OutboundRequest, ReqwestTransport};

use crate::auth::AuthScheme;
use crate::environment::{Environment, EnvironmentStore};
use crate::error::StoreError;
use crate::models::{
    ExecutionOutcome, ExecutionOverrides, ExecutionResult, RequestDefinition,
};
use crate::requests::RequestStore;
use crate::variables;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Executes stored requests.
///
/// Cheap to clone; clones share the same stores and transport.
#[derive(Clone)]
pub struct ExecutionEngine {
    requests: Arc<dyn RequestStore>,
    environments: Arc<dyn EnvironmentStore>,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine").finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        environments: Arc<dyn EnvironmentStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            requests,
            environments,
            transport,
        }
    }

    /// Creates an engine that dispatches through a [`ReqwestTransport`]
    /// configured from the global configuration.
    pub fn with_default_transport(
        requests: Arc<dyn RequestStore>,
        environments: Arc<dyn EnvironmentStore>,
    ) -> Result<Self, RequestError> {
        let transport = ReqwestTransport::from_global_config()?;
        Ok(Self::new(requests, environments, Arc::new(transport)))
    }

    /// Executes the stored request `request_id`.
    ///
    /// # Arguments
    ///
    /// * `request_id` - Id of the stored request definition
    /// * `overrides` - Caller-supplied URL, headers, body and environment
    ///
    /// # Returns
    ///
    /// The execution result, including failed dispatches. `Err` only when the
    /// definition does not exist or the store is unavailable.
    pub async fn execute(
        &self,
        request_id: &str,
        overrides: ExecutionOverrides,
    ) -> Result<ExecutionResult, StoreError> {
        let definition = self.requests.get_by_id(request_id)?;

        let ExecutionOverrides {
            url: override_url,
            headers: override_headers,
            body: override_body,
            environment_id,
        } = overrides;

        let mut url = override_url.unwrap_or_else(|| definition.url.clone());
        let mut headers = definition.headers.clone().unwrap_or_default();
        headers.extend(override_headers.unwrap_or_default());
        let mut body = override_body.or_else(|| definition.body_content.clone());

        let environment = self.select_environment(environment_id.as_deref(), &url, &headers);
        let empty = HashMap::new();
        let vars = environment.as_ref().map_or(&empty, |env| &env.variables);

        if let Some(env) = &environment {
            url = resolve_field(url, vars, "url");
            headers = headers
                .into_iter()
                .map(|(name, value)| {
                    let value = resolve_field(value, vars, &name);
                    (name, value)
                })
                .collect();
            body = body.map(|b| resolve_field(b, vars, "body"));

            let unresolved = variables::unresolved_names(&url, vars);
            if !unresolved.is_empty() {
                log::debug!(
                    "Unresolved variables in URL after applying environment '{}': {:?}",
                    env.name,
                    unresolved
                );
            }
        }

        let mut query = resolved_query_params(&definition, vars);
        apply_auth(&definition, vars, &mut headers, &mut query);
        let url = append_query(url, &query);

        let outbound = OutboundRequest {
            method: definition.method,
            url,
            headers,
            body,
        };

        let timestamp = Utc::now();
        let start = Instant::now();
        let sent = self.transport.send(&outbound).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let outcome = match sent {
            Ok(response) => ExecutionOutcome::Completed(response),
            Err(e) => {
                log::warn!(
                    "Request {} {} failed: {}",
                    outbound.method,
                    outbound.url,
                    e
                );
                ExecutionOutcome::Failed {
                    kind: e.failure_kind(),
                    message: e.to_string(),
                }
            }
        };

        Ok(ExecutionResult {
            request_id: definition.id,
            method: outbound.method,
            url: outbound.url,
            headers: outbound.headers,
            request_body: outbound.body,
            environment_id: environment.map(|env| env.id),
            duration_ms,
            timestamp,
            outcome,
        })
    }

    /// Picks the environment used for resolution.
    ///
    /// An explicit id wins. Without one, the most recently created active
    /// environment of any workspace is used, but only when the URL or headers
    /// contain a placeholder.
    fn select_environment(
        &self,
        environment_id: Option<&str>,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Option<Environment> {
        if let Some(id) = environment_id {
            return match self.environments.get_by_id(id) {
                Ok(env) => Some(env),
                Err(e) => {
                    log::warn!("Environment {} not applied: {}", id, e);
                    None
                }
            };
        }

        let templated = variables::contains_placeholder(url)
            || headers.iter().any(|(name, value)| {
                variables::contains_placeholder(name) || variables::contains_placeholder(value)
            });
        if !templated {
            return None;
        }

        match self.environments.find_most_recent_active() {
            Ok(Some(env)) => {
                log::debug!("Falling back to active environment '{}' ({})", env.name, env.id);
                Some(env)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Active environment lookup failed: {}", e);
                None
            }
        }
    }
}

/// Resolves one outbound field, keeping it as written when resolution fails.
fn resolve_field(text: String, vars: &HashMap<String, String>, field: &str) -> String {
    match variables::try_resolve(&text, vars) {
        Ok(resolved) => resolved,
        Err(e) => {
            log::warn!("Variable resolution skipped for {}: {}", field, e);
            text
        }
    }
}

/// Stored query parameters with placeholders resolved, ordered by name.
fn resolved_query_params(
    definition: &RequestDefinition,
    vars: &HashMap<String, String>,
) -> Vec<(String, String)> {
    let mut query: Vec<(String, String)> = definition
        .query_params
        .iter()
        .flatten()
        .map(|(k, v)| (variables::resolve(k, vars), variables::resolve(v, vars)))
        .collect();
    query.sort();
    query
}

fn apply_auth(
    definition: &RequestDefinition,
    vars: &HashMap<String, String>,
    headers: &mut HashMap<String, String>,
    query: &mut Vec<(String, String)>,
) {
    match AuthScheme::from_definition(definition) {
        Ok(scheme) => {
            scheme.resolve_with(vars).apply(headers, query);
        }
        Err(e) => log::warn!("Skipping auth for request {}: {}", definition.id, e),
    }
}

/// Appends form-encoded pairs, keeping any query string already present.
fn append_query(mut url: String, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return url;
    }

    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();

    let (base, fragment) = match url.find('#') {
        Some(idx) => {
            let fragment = url.split_off(idx);
            (url, fragment)
        }
        None => (url, String::new()),
    };

    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };

    format!("{}{}{}{}", base, separator, encoded, fragment)
}
