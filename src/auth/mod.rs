//! HTTP authentication module.
//!
//! Turns the `auth_type`/`auth_details` stored with a request definition into
//! an [`AuthScheme`], resolves placeholders in its credentials and applies it
//! to the outgoing headers or query string. Headers the caller already set
//! always win: a scheme never replaces an existing header of the same name.

pub mod basic;
pub mod bearer;

use crate::models::{AuthType, RequestDefinition};
use crate::variables;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Header name used for API keys when the details do not name one.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Where an API key is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
}

/// Authentication scheme derived from a request definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    /// HTTP Basic authentication (RFC 7617)
    Basic { username: String, password: String },
    /// Bearer token authentication (RFC 6750); also used for OAuth2 access tokens
    Bearer { token: String },
    /// Static key sent as a header or query parameter
    ApiKey {
        name: String,
        value: String,
        location: ApiKeyLocation,
    },
    /// No authentication
    None,
}

/// Errors that can occur while reading stored auth details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid authentication format: {0}")]
    InvalidFormat(String),
}

impl AuthScheme {
    /// Builds the scheme stored with `definition`.
    ///
    /// # Returns
    ///
    /// `AuthScheme::None` when the definition has no auth, or an `AuthError`
    /// when the details do not carry what the auth type needs.
    pub fn from_definition(definition: &RequestDefinition) -> Result<Self, AuthError> {
        let details = definition.auth_details.as_ref().unwrap_or(&Value::Null);

        if definition.auth_type != AuthType::None && !(details.is_object() || details.is_null()) {
            return Err(AuthError::InvalidFormat(
                "auth details must be an object".to_string(),
            ));
        }

        match definition.auth_type {
            AuthType::None => Ok(AuthScheme::None),
            AuthType::Bearer | AuthType::Oauth2 => Ok(AuthScheme::Bearer {
                token: bearer::token_from_details(details)?,
            }),
            AuthType::Basic => {
                let (username, password) = basic::credentials_from_details(details)?;
                Ok(AuthScheme::Basic { username, password })
            }
            AuthType::ApiKey => api_key_from_details(details),
        }
    }

    /// Substitutes `{{name}}` placeholders in every credential field.
    pub fn resolve_with(self, vars: &HashMap<String, String>) -> Self {
        match self {
            AuthScheme::Basic { username, password } => AuthScheme::Basic {
                username: variables::resolve(&username, vars),
                password: variables::resolve(&password, vars),
            },
            AuthScheme::Bearer { token } => AuthScheme::Bearer {
                token: variables::resolve(&token, vars),
            },
            AuthScheme::ApiKey {
                name,
                value,
                location,
            } => AuthScheme::ApiKey {
                name: variables::resolve(&name, vars),
                value: variables::resolve(&value, vars),
                location,
            },
            AuthScheme::None => AuthScheme::None,
        }
    }

    /// Applies the scheme to outgoing headers and query parameters.
    ///
    /// Returns `true` if anything was added.
    pub fn apply(
        &self,
        headers: &mut HashMap<String, String>,
        query: &mut Vec<(String, String)>,
    ) -> bool {
        match self {
            AuthScheme::Basic { username, password } => {
                insert_if_absent(headers, "Authorization", basic::basic_auth(username, password))
            }
            AuthScheme::Bearer { token } => {
                insert_if_absent(headers, "Authorization", bearer::bearer_token(token))
            }
            AuthScheme::ApiKey {
                name,
                value,
                location: ApiKeyLocation::Header,
            } => insert_if_absent(headers, name, value.clone()),
            AuthScheme::ApiKey {
                name,
                value,
                location: ApiKeyLocation::Query,
            } => {
                if query.iter().any(|(k, _)| k == name) {
                    return false;
                }
                query.push((name.clone(), value.clone()));
                true
            }
            AuthScheme::None => false,
        }
    }
}

/// Case-insensitive header lookup.
pub fn has_header(headers: &HashMap<String, String>, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

fn insert_if_absent(headers: &mut HashMap<String, String>, name: &str, value: String) -> bool {
    if has_header(headers, name) {
        return false;
    }
    headers.insert(name.to_string(), value);
    true
}

fn api_key_from_details(details: &Value) -> Result<AuthScheme, AuthError> {
    let value = detail_str(details, &["value", "apiKey", "key"])
        .ok_or_else(|| AuthError::MissingCredentials("api key requires a value".into()))?;

    // `key` names the header only when a separate `value` is present
    let name = match detail_str(details, &["value"]) {
        Some(_) => detail_str(details, &["key", "name", "header"]),
        None => detail_str(details, &["name", "header"]),
    }
    .filter(|name| !name.trim().is_empty())
    .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string());

    let location = match detail_str(details, &["in", "addTo"]).as_deref() {
        None | Some("header") => ApiKeyLocation::Header,
        Some("query") => ApiKeyLocation::Query,
        Some(other) => {
            return Err(AuthError::InvalidFormat(format!(
                "unknown api key location '{}'",
                other
            )))
        }
    };

    Ok(AuthScheme::ApiKey {
        name,
        value,
        location,
    })
}

/// First of `keys` present in `details` as a string, number or bool.
pub(crate) fn detail_str(details: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| details.get(*key))
        .find_map(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
}
