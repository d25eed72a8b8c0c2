//! Configuration management.
//!
//! Settings are read from the `"rest-workbench"` key of a JSON settings
//! object, merged with defaults, validated and installed in a process-wide
//! singleton that the executor and history store read from.

pub mod schema;

pub use schema::WorkbenchConfig;

use once_cell::sync::Lazy;
use serde_json::Value;
use std::path::Path;
use std::sync::RwLock;
use thiserror::Error;

/// Key under which the workbench settings live in a settings object.
pub const SETTINGS_KEY: &str = "rest-workbench";

static CONFIG: Lazy<RwLock<WorkbenchConfig>> =
    Lazy::new(|| RwLock::new(WorkbenchConfig::default()));

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads configuration from a settings JSON value.
///
/// Unparseable workbench settings are reported with a warning and the
/// defaults are used instead. A config that fails validation is rejected and
/// the global configuration is left unchanged.
///
/// # Example
///
/// ```no_run
/// use rest_workbench::config::load_config;
/// use serde_json::json;
///
/// let settings = json!({
///     "rest-workbench": {
///         "timeout": 60000,
///         "validateSsl": false
///     }
/// });
///
/// let config = load_config(Some(settings)).unwrap();
/// assert_eq!(config.timeout, 60000);
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<WorkbenchConfig, ConfigError> {
    let mut config = WorkbenchConfig::default();

    if let Some(settings) = settings_json.as_ref().and_then(|s| s.get(SETTINGS_KEY)) {
        match serde_json::from_value::<WorkbenchConfig>(settings.clone()) {
            Ok(user_config) => config = user_config,
            Err(e) => {
                log::warn!(
                    "Failed to parse {} settings: {}. Using defaults.",
                    SETTINGS_KEY,
                    e
                );
            }
        }
    }

    config.validate().map_err(ConfigError::Invalid)?;

    if let Ok(mut global_config) = CONFIG.write() {
        *global_config = config.clone();
    }

    Ok(config)
}

/// Loads configuration from a JSON file.
///
/// The file may either hold the settings object directly or wrap it under
/// the `"rest-workbench"` key.
pub fn load_config_file(path: &Path) -> Result<WorkbenchConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let settings = if value.get(SETTINGS_KEY).is_some() {
        value
    } else {
        let mut wrapper = serde_json::Map::new();
        wrapper.insert(SETTINGS_KEY.to_string(), value);
        Value::Object(wrapper)
    };

    load_config(Some(settings))
}

/// Returns a copy of the current global configuration, or the defaults if
/// nothing has been loaded.
pub fn get_config() -> WorkbenchConfig {
    CONFIG
        .read()
        .map(|c| c.clone())
        .unwrap_or_else(|_| WorkbenchConfig::default())
}

/// Applies `updater` to the global configuration.
///
/// If the result fails validation the configuration reverts to defaults.
///
/// ```no_run
/// use rest_workbench::config::update_config;
///
/// update_config(|config| {
///     config.record_history = true;
/// });
/// ```
pub fn update_config<F>(updater: F)
where
    F: FnOnce(&mut WorkbenchConfig),
{
    if let Ok(mut config) = CONFIG.write() {
        updater(&mut config);

        if let Err(e) = config.validate() {
            log::warn!("Configuration validation failed after update: {}", e);
            *config = WorkbenchConfig::default();
        }
    }
}

/// Resets the configuration to defaults.
pub fn reset_config() {
    if let Ok(mut config) = CONFIG.write() {
        *config = WorkbenchConfig::default();
    }
}
