//! Environment data models.
//!
//! An environment is a named set of string variables, optionally tied to a
//! workspace. At most one environment per workspace is active at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Represents a single environment with its variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: String,

    /// Owning workspace, if any
    #[serde(default)]
    pub workspace_id: Option<String>,

    /// Environment name (e.g., "dev", "staging", "production")
    pub name: String,

    /// Variable key-value pairs for this environment
    #[serde(default, deserialize_with = "deserialize_variables")]
    pub variables: HashMap<String, String>,

    /// Only changed through the store's activate/deactivate operations
    #[serde(default)]
    pub is_active: bool,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Environment {
    /// Gets a variable value by name
    pub fn get(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    /// Checks if a variable exists
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// Returns `true` when the environment belongs to `workspace_id`
    pub fn in_workspace(&self, workspace_id: &str) -> bool {
        self.workspace_id.as_deref() == Some(workspace_id)
    }
}

/// Input for creating an environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnvironment {
    pub name: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_variables")]
    pub variables: HashMap<String, String>,
    /// Request activation after creation. Ignored without a workspace.
    #[serde(default)]
    pub is_active: bool,
}

impl NewEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn in_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }
}

/// Partial update of an environment. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub variables: Option<HashMap<String, String>>,
    /// `Some(true)` activates, `Some(false)` deactivates.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Accepts `null` or an object whose values may be strings, numbers,
/// booleans or nested JSON. Non-string scalars are converted to their text
/// form, nested values to compact JSON, `null` values to an empty string.
pub fn deserialize_variables<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}
