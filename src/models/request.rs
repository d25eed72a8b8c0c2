//! Stored request definitions.
//!
//! A `RequestDefinition` is the persisted template the execution engine reads:
//! method, URL, headers, body and auth settings, possibly containing
//! `{{variable}}` placeholders that are resolved at execution time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP request method.
///
/// Only the methods a stored request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// HTTP GET method - retrieve a resource
    GET,
    /// HTTP POST method - submit data to create a resource
    POST,
    /// HTTP PUT method - replace a resource
    PUT,
    /// HTTP PATCH method - partially modify a resource
    PATCH,
    /// HTTP DELETE method - remove a resource
    DELETE,
    /// HTTP HEAD method - retrieve headers only
    HEAD,
    /// HTTP OPTIONS method - describe communication options
    OPTIONS,
}

impl HttpMethod {
    /// Returns the string representation of the HTTP method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }

    /// Parses a string into an HttpMethod, ignoring case.
    ///
    /// Returns `None` for anything outside the supported set, including
    /// TRACE and CONNECT.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "PATCH" => Some(HttpMethod::PATCH),
            "DELETE" => Some(HttpMethod::DELETE),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of body stored with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyType {
    #[default]
    None,
    Json,
    FormData,
    #[serde(rename = "x-www-form-urlencoded")]
    XWwwFormUrlencoded,
    Raw,
    Binary,
}

/// Authentication scheme stored with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthType {
    #[default]
    None,
    Bearer,
    Basic,
    ApiKey,
    Oauth2,
}

/// A persisted request template.
///
/// The URL is kept as an opaque string: relative paths and strings full of
/// placeholders are valid even though they do not parse as URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDefinition {
    pub id: String,

    /// Owning collection. Requests may be unassigned.
    #[serde(default)]
    pub collection_id: Option<String>,

    /// Workspace of the owning collection, carried for history linkage.
    #[serde(default)]
    pub workspace_id: Option<String>,

    pub name: String,

    pub method: HttpMethod,

    /// Target URL, possibly containing `{{variable}}` placeholders.
    pub url: String,

    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    /// Query parameters appended to the URL at dispatch time.
    #[serde(default)]
    pub query_params: Option<HashMap<String, String>>,

    #[serde(default)]
    pub body_type: BodyType,

    #[serde(default)]
    pub body_content: Option<String>,

    #[serde(default)]
    pub auth_type: AuthType,

    /// Scheme-specific auth settings (`token`, `username`/`password`,
    /// `key`/`value`/`in`, `accessToken`).
    #[serde(default)]
    pub auth_details: Option<serde_json::Value>,

    /// Display ordering within a collection.
    #[serde(default)]
    pub sort_order: i32,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl RequestDefinition {
    /// Creates a new definition with a fresh id and default optional fields.
    pub fn new(name: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            collection_id: None,
            workspace_id: None,
            name: name.into(),
            method,
            url: url.into(),
            headers: None,
            query_params: None,
            body_type: BodyType::None,
            body_content: None,
            auth_type: AuthType::None,
            auth_details: None,
            sort_order: 0,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a header, creating the header map when absent.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
    }

    /// Sets the body content together with its type.
    pub fn set_body(&mut self, body_type: BodyType, content: impl Into<String>) {
        self.body_type = body_type;
        self.body_content = Some(content.into());
    }

    /// Checks if the request has a non-empty body.
    pub fn has_body(&self) -> bool {
        self.body_content.as_ref().map_or(false, |b| !b.is_empty())
    }
}
