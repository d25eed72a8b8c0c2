//! Store error types shared by the request, environment and history stores.

use std::fmt;
use thiserror::Error;

/// Kind of entity a lookup was performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Request,
    Environment,
    Workspace,
    Collection,
    History,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Request => "Request",
            EntityKind::Environment => "Environment",
            EntityKind::Workspace => "Workspace",
            EntityKind::Collection => "Collection",
            EntityKind::History => "Request history",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the stores.
///
/// `NotFound` is the only variant the execution and environment operations
/// surface as a terminal, distinguishable failure. `Unavailable` covers a
/// poisoned lock or a backing file that cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns `true` for the `NotFound` variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub(crate) fn poisoned() -> Self {
        StoreError::Unavailable("lock poisoned".to_string())
    }
}
