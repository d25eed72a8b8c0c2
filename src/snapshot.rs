//! Workbench state file.
//!
//! A single JSON document holding stored requests, environments and history,
//! used by the command-line front end to keep state between runs. A missing
//! file loads as an empty state.

use crate::environment::{Environment, EnvironmentStore, InMemoryEnvironmentStore};
use crate::error::StoreError;
use crate::history::{HistoryError, HistoryRecorder, InMemoryHistory, RequestHistoryEntry};
use crate::models::RequestDefinition;
use crate::requests::{InMemoryRequestStore, RequestStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Persisted contents of the stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchState {
    #[serde(default)]
    pub requests: Vec<RequestDefinition>,
    #[serde(default)]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub history: Vec<RequestHistoryEntry>,
}

impl WorkbenchState {
    /// Reads the state at `path`. A missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No state file at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the state to `path`, replacing it atomically.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let io_err = |source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(io_err)?;
        fs::rename(&temp_path, path).map_err(io_err)?;
        Ok(())
    }

    /// Copies the current contents of the stores.
    pub fn capture(
        requests: &dyn RequestStore,
        environments: &dyn EnvironmentStore,
        history: &dyn HistoryRecorder,
    ) -> Result<Self, SnapshotError> {
        Ok(Self {
            requests: requests.list_all()?,
            environments: environments.list_all()?,
            history: history.load()?,
        })
    }

    /// Builds in-memory stores holding this state.
    pub fn into_stores(self) -> (InMemoryRequestStore, InMemoryEnvironmentStore, InMemoryHistory) {
        (
            InMemoryRequestStore::from_definitions(self.requests),
            InMemoryEnvironmentStore::from_environments(self.environments),
            InMemoryHistory::from_entries(self.history),
        )
    }
}
