//! Configuration schema for the workbench.
//!
//! Every field has its own serde default so partial settings objects are
//! accepted and merged with the defaults field by field.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main configuration structure.
///
/// Read from the `"rest-workbench"` key of a settings object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchConfig {
    /// Request timeout in milliseconds.
    ///
    /// Covers connection, headers and body download. Defaults to 30000ms.
    /// Must be greater than 0.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Whether to automatically follow HTTP redirects. Defaults to true.
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow. Only used when
    /// `follow_redirects` is true. Defaults to 10.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Whether to validate SSL/TLS certificates. Defaults to true.
    #[serde(default = "default_validate_ssl")]
    pub validate_ssl: bool,

    /// Headers sent with every request unless the request sets them itself.
    #[serde(default = "default_headers")]
    pub default_headers: HashMap<String, String>,

    /// Maximum number of history entries kept by the file-backed store.
    /// Defaults to 1000. Must be greater than 0.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Path of the JSON-lines history file, if history is persisted.
    #[serde(default)]
    pub history_file: Option<PathBuf>,

    /// Whether executions made through the API facade are recorded.
    #[serde(default)]
    pub record_history: bool,

    /// Whether credentials in recorded request headers are redacted.
    #[serde(default = "default_sanitize_history_headers")]
    pub sanitize_history_headers: bool,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            follow_redirects: default_follow_redirects(),
            max_redirects: default_max_redirects(),
            validate_ssl: default_validate_ssl(),
            default_headers: default_headers(),
            history_limit: default_history_limit(),
            history_file: None,
            record_history: false,
            sanitize_history_headers: default_sanitize_history_headers(),
        }
    }
}

impl WorkbenchConfig {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// `Ok(())` if all settings are valid, or `Err` with a descriptive message.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.history_limit == 0 {
            return Err("historyLimit must be greater than 0".to_string());
        }

        // max_redirects may be 0 (no redirects)

        Ok(())
    }

    /// Returns the timeout as a `std::time::Duration`.
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout)
    }
}

fn default_timeout() -> u64 {
    30000
}

fn default_follow_redirects() -> bool {
    true
}

fn default_max_redirects() -> u32 {
    10
}

fn default_validate_ssl() -> bool {
    true
}

fn default_history_limit() -> usize {
    1000
}

fn default_sanitize_history_headers() -> bool {
    true
}

fn default_headers() -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(
        "User-Agent".to_string(),
        concat!("rest-workbench/", env!("CARGO_PKG_VERSION")).to_string(),
    );
    headers
}
