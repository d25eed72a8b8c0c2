//! Request history.
//!
//! Every execution can be recorded as a [`RequestHistoryEntry`] linked to its
//! source request, collection and workspace. Entries are append-only apart
//! from explicit corrections and cascade deletes.
//!
//! # Example
//!
//! ```ignore
//! use rest_workbench::history::{HistoryLink, HistoryRecorder, InMemoryHistory};
//!
//! let history = InMemoryHistory::new();
//! let entry = history.record(&result, &HistoryLink::from(&definition))?;
//! let recent = history.list_by_request(&definition.id)?;
//! ```

pub mod models;
pub mod search;
pub mod storage;

pub use models::{
    HistoryCorrection, HistoryError, HistoryLink, RequestHistoryEntry, MAX_RESPONSE_BODY_SIZE,
    SENSITIVE_HEADERS,
};
pub use search::{
    filter_by_method, filter_by_status, filter_errors, search_history, DEFAULT_RECENT_LIMIT,
    GROUP_HISTORY_LIMIT, REQUEST_HISTORY_LIMIT,
};
pub use storage::{HistoryConfig, HistoryRecorder, InMemoryHistory, JsonlHistoryStore};
