//! HTTP dispatch.
//!
//! [`HttpTransport`] is the one step of an execution that leaves the
//! process. [`ReqwestTransport`] is the production implementation; tests can
//! substitute their own.

use super::config::ExecutionConfig;
use super::error::RequestError;
use crate::models::{HttpMethod, HttpResponse};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use std::collections::HashMap;

/// A fully resolved request, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

/// Sends a resolved request and returns the raw response.
///
/// Any HTTP status is a successful send; only failures to obtain a response
/// are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, RequestError>;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    default_headers: HashMap<String, String>,
}

impl ReqwestTransport {
    /// Builds a client honoring timeout, redirect and certificate settings.
    pub fn new(config: &ExecutionConfig) -> Result<Self, RequestError> {
        let redirect_policy = if config.follow_redirects {
            Policy::limited(config.max_redirects as usize)
        } else {
            Policy::none()
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout_duration())
            .redirect(redirect_policy)
            .danger_accept_invalid_certs(!config.validate_ssl)
            .build()
            .map_err(|e| RequestError::BuildError(e.to_string()))?;

        Ok(Self {
            client,
            default_headers: config.default_headers.clone(),
        })
    }

    /// Builds a transport from the global configuration.
    pub fn from_global_config() -> Result<Self, RequestError> {
        Self::new(&ExecutionConfig::from_global_config())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<HttpResponse, RequestError> {
        let url = validate_url(&request.url)?;

        let method = match request.method {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::DELETE => reqwest::Method::DELETE,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::HEAD => reqwest::Method::HEAD,
            HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
        };

        let mut req_builder = self.client.request(method, url);

        for (name, value) in &self.default_headers {
            if !crate::auth::has_header(&request.headers, name) {
                req_builder = req_builder.header(name, value);
            }
        }

        for (name, value) in &request.headers {
            req_builder = req_builder.header(name, value);
        }

        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let response = req_builder.send().await.map_err(RequestError::from)?;

        let status_code = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                headers
                    .entry(name.as_str().to_string())
                    .and_modify(|existing: &mut String| {
                        existing.push_str(", ");
                        existing.push_str(value_str);
                    })
                    .or_insert_with(|| value_str.to_string());
            }
        }

        let bytes = response.bytes().await.map_err(RequestError::from)?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(HttpResponse {
            status_code,
            status_text,
            headers,
            body,
        })
    }
}

/// Parses the URL and rejects schemes other than http and https.
pub fn validate_url(raw: &str) -> Result<url::Url, RequestError> {
    let url = url::Url::parse(raw).map_err(|e| RequestError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RequestError::UnsupportedProtocol(other.to_string())),
    }
}
