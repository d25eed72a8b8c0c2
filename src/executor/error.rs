//! HTTP request execution error types.
//!
//! These never escape [`ExecutionEngine::execute`](super::ExecutionEngine::execute):
//! the engine folds them into a failed execution outcome.

use crate::models::FailureKind;
use thiserror::Error;

/// Errors that can occur while dispatching a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Connection failures, DNS resolution errors and other network-level issues.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The request took longer than the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The resolved URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Certificate validation errors, handshake failures and similar.
    #[error("TLS/SSL error: {0}")]
    TlsError(String),

    /// Invalid headers or a malformed response.
    #[error("HTTP protocol error: {0}")]
    ProtocolError(String),

    /// The outgoing request could not be constructed.
    #[error("Request build error: {0}")]
    BuildError(String),

    /// Only HTTP and HTTPS are supported.
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),
}

impl RequestError {
    /// Category recorded in a failed execution outcome.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            RequestError::NetworkError(_) | RequestError::ProtocolError(_) => FailureKind::Network,
            RequestError::Timeout => FailureKind::Timeout,
            RequestError::InvalidUrl(_) => FailureKind::InvalidUrl,
            RequestError::TlsError(_) => FailureKind::Tls,
            RequestError::BuildError(_) => FailureKind::Build,
            RequestError::UnsupportedProtocol(_) => FailureKind::UnsupportedProtocol,
        }
    }
}

/// Maps reqwest's error categories onto ours.
impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_builder() {
            RequestError::BuildError(message)
        } else if is_tls_message(&message) || source_chain_mentions_tls(&err) {
            RequestError::TlsError(message)
        } else if err.is_connect() || err.is_request() {
            RequestError::NetworkError(message)
        } else if err.is_decode() || err.is_body() {
            RequestError::ProtocolError(message)
        } else {
            RequestError::NetworkError(message)
        }
    }
}

impl From<url::ParseError> for RequestError {
    fn from(err: url::ParseError) -> Self {
        RequestError::InvalidUrl(err.to_string())
    }
}

fn is_tls_message(message: &str) -> bool {
    message.contains("certificate") || message.contains("TLS") || message.contains("SSL")
}

fn source_chain_mentions_tls(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if is_tls_message(&inner.to_string()) {
            return true;
        }
        source = inner.source();
    }
    false
}
