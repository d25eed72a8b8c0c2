//! Storage for request history.
//!
//! [`HistoryRecorder`] is implemented by an in-memory store and by a JSONL
//! (JSON Lines) file store. The file store appends one line per entry and
//! rewrites the file on corrections, deletions and limit enforcement.
//! Corrupted lines are skipped when loading.

use super::models::{HistoryCorrection, HistoryError, HistoryLink, RequestHistoryEntry};
use super::search;
use crate::config::get_config;
use crate::models::ExecutionResult;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Default maximum number of history entries to retain.
pub const DEFAULT_MAX_HISTORY_ENTRIES: usize = 1000;

/// Records executions and answers history queries.
///
/// Implementors provide the three storage primitives; the query and
/// mutation operations are built on top of them.
pub trait HistoryRecorder: Send + Sync {
    /// Stores a prepared entry.
    fn append(&self, entry: RequestHistoryEntry) -> Result<(), HistoryError>;

    /// All entries in recording order.
    fn load(&self) -> Result<Vec<RequestHistoryEntry>, HistoryError>;

    /// Runs `f` over all entries; the store persists the result when `f`
    /// returns `true`.
    fn modify(
        &self,
        f: &mut dyn FnMut(&mut Vec<RequestHistoryEntry>) -> bool,
    ) -> Result<(), HistoryError>;

    /// Whether sensitive headers are redacted before storage.
    fn sanitizes_headers(&self) -> bool {
        false
    }

    /// Records an execution.
    ///
    /// # Returns
    ///
    /// The entry as stored, after redaction and body-size limits.
    fn record(
        &self,
        result: &ExecutionResult,
        link: &HistoryLink,
    ) -> Result<RequestHistoryEntry, HistoryError> {
        let entry = RequestHistoryEntry::from_execution(result, link)
            .prepare_for_storage(self.sanitizes_headers());
        self.append(entry.clone())?;
        log::debug!("Recorded history entry {} for {}", entry.id, entry.url);
        Ok(entry)
    }

    fn get_by_id(&self, id: &str) -> Result<RequestHistoryEntry, HistoryError> {
        self.load()?
            .into_iter()
            .find(|entry| entry.id == id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }

    /// The `limit` most recent entries.
    fn list_recent(&self, limit: usize) -> Result<Vec<RequestHistoryEntry>, HistoryError> {
        Ok(search::recent(self.load()?, limit))
    }

    fn list_by_request(&self, request_id: &str) -> Result<Vec<RequestHistoryEntry>, HistoryError> {
        Ok(search::by_request(self.load()?, request_id))
    }

    fn list_by_collection(
        &self,
        collection_id: &str,
    ) -> Result<Vec<RequestHistoryEntry>, HistoryError> {
        Ok(search::by_collection(self.load()?, collection_id))
    }

    fn list_by_workspace(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<RequestHistoryEntry>, HistoryError> {
        Ok(search::by_workspace(self.load()?, workspace_id))
    }

    /// Applies a correction to a stored entry.
    fn update(
        &self,
        id: &str,
        correction: HistoryCorrection,
    ) -> Result<RequestHistoryEntry, HistoryError> {
        correction.validate()?;

        let mut correction = Some(correction);
        let mut updated: Option<Result<RequestHistoryEntry, HistoryError>> = None;
        self.modify(&mut |entries| {
            let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) else {
                return false;
            };
            let Some(correction) = correction.take() else {
                return false;
            };
            let applied = entry.apply(correction).map(|_| entry.clone());
            let changed = applied.is_ok();
            updated = Some(applied);
            changed
        })?;

        updated.unwrap_or_else(|| Err(HistoryError::NotFound(id.to_string())))
    }

    fn delete(&self, id: &str) -> Result<RequestHistoryEntry, HistoryError> {
        let mut removed = None;
        self.modify(&mut |entries| match entries.iter().position(|e| e.id == id) {
            Some(idx) => {
                removed = Some(entries.remove(idx));
                true
            }
            None => false,
        })?;
        removed.ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }

    /// Cascade delete for a removed request. Returns the number removed.
    fn delete_by_request(&self, request_id: &str) -> Result<usize, HistoryError> {
        remove_where(self, |e| e.source_request_id.as_deref() == Some(request_id))
    }

    fn delete_by_collection(&self, collection_id: &str) -> Result<usize, HistoryError> {
        remove_where(self, |e| e.collection_id.as_deref() == Some(collection_id))
    }

    fn delete_by_workspace(&self, workspace_id: &str) -> Result<usize, HistoryError> {
        remove_where(self, |e| e.workspace_id.as_deref() == Some(workspace_id))
    }
}

fn remove_where<R, F>(recorder: &R, matches: F) -> Result<usize, HistoryError>
where
    R: HistoryRecorder + ?Sized,
    F: Fn(&RequestHistoryEntry) -> bool,
{
    let mut removed = 0;
    recorder.modify(&mut |entries| {
        let before = entries.len();
        entries.retain(|e| !matches(e));
        removed = before - entries.len();
        removed > 0
    })?;
    Ok(removed)
}

/// In-memory history, lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: RwLock<Vec<RequestHistoryEntry>>,
    sanitize: bool,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from previously recorded entries (in recording order).
    pub fn from_entries(entries: Vec<RequestHistoryEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            sanitize: false,
        }
    }

    /// Enables redaction of sensitive headers on record.
    pub fn with_sanitized_headers(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    fn poisoned() -> HistoryError {
        HistoryError::Unavailable("lock poisoned".to_string())
    }
}

impl HistoryRecorder for InMemoryHistory {
    fn append(&self, entry: RequestHistoryEntry) -> Result<(), HistoryError> {
        self.entries
            .write()
            .map_err(|_| Self::poisoned())?
            .push(entry);
        Ok(())
    }

    fn load(&self) -> Result<Vec<RequestHistoryEntry>, HistoryError> {
        Ok(self.entries.read().map_err(|_| Self::poisoned())?.clone())
    }

    fn modify(
        &self,
        f: &mut dyn FnMut(&mut Vec<RequestHistoryEntry>) -> bool,
    ) -> Result<(), HistoryError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        f(&mut *entries);
        Ok(())
    }

    fn sanitizes_headers(&self) -> bool {
        self.sanitize
    }
}

/// Configuration for the file-backed store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of entries to keep; the oldest are evicted first.
    pub max_entries: usize,

    /// Whether to redact sensitive headers before storage.
    pub sanitize_sensitive_headers: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_HISTORY_ENTRIES,
            sanitize_sensitive_headers: true,
        }
    }
}

impl HistoryConfig {
    /// Reads `historyLimit` and `sanitizeHistoryHeaders` from the global config.
    pub fn from_global_config() -> Self {
        let global_config = get_config();
        Self {
            max_entries: global_config.history_limit,
            sanitize_sensitive_headers: global_config.sanitize_history_headers,
        }
    }
}

/// History persisted as JSON lines.
#[derive(Debug)]
pub struct JsonlHistoryStore {
    path: PathBuf,
    config: HistoryConfig,
    lock: Mutex<()>,
}

impl JsonlHistoryStore {
    /// Opens (without creating) a history file at `path`.
    pub fn new(path: impl Into<PathBuf>, config: HistoryConfig) -> Self {
        Self {
            path: path.into(),
            config,
            lock: Mutex::new(()),
        }
    }

    /// Uses the global config's `historyFile`, or `None` if unset.
    pub fn from_global_config() -> Option<Self> {
        get_config()
            .history_file
            .map(|path| Self::new(path, HistoryConfig::from_global_config()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, HistoryError> {
        self.lock
            .lock()
            .map_err(|_| HistoryError::Unavailable("lock poisoned".to_string()))
    }

    /// Reads every parseable line. Missing file means empty history.
    fn read_entries(&self) -> Result<Vec<RequestHistoryEntry>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut corrupted_lines = 0;

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = match line_result {
                Ok(line) => line,
                Err(e) => {
                    corrupted_lines += 1;
                    log::warn!("Error reading history line {}: {}", line_num + 1, e);
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<RequestHistoryEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    corrupted_lines += 1;
                    log::warn!(
                        "Skipping corrupted history entry at line {}: {}",
                        line_num + 1,
                        e
                    );
                }
            }
        }

        if corrupted_lines > 0 && corrupted_lines > entries.len() {
            log::warn!(
                "History file {} has significant corruption ({} corrupted lines, {} valid entries)",
                self.path.display(),
                corrupted_lines,
                entries.len()
            );
        }

        Ok(entries)
    }

    /// Replaces the file through a temporary sibling and a rename.
    fn write_entries(&self, entries: &[RequestHistoryEntry]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("jsonl.tmp");
        let mut temp_file = File::create(&temp_path)?;
        for entry in entries {
            writeln!(temp_file, "{}", serde_json::to_string(entry)?)?;
        }
        temp_file.flush()?;
        drop(temp_file);

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Evicts the oldest entries beyond `max_entries`. Returns how many were removed.
    fn enforce_limit(&self) -> Result<usize, HistoryError> {
        let mut entries = self.read_entries()?;
        if entries.len() <= self.config.max_entries {
            return Ok(0);
        }

        let excess = entries.len() - self.config.max_entries;
        // Stable sort keeps recording order among equal timestamps
        entries.sort_by(|a, b| a.executed_at.cmp(&b.executed_at));
        entries.drain(..excess);
        self.write_entries(&entries)?;
        Ok(excess)
    }

    /// Rewrites the file keeping only parseable entries.
    ///
    /// Returns the number of valid entries kept.
    pub fn rebuild(&self) -> Result<usize, HistoryError> {
        let _guard = self.guard()?;
        if !self.path.exists() {
            return Ok(0);
        }
        let entries = self.read_entries()?;
        self.write_entries(&entries)?;
        Ok(entries.len())
    }

    /// Deletes the history file.
    pub fn clear(&self) -> Result<(), HistoryError> {
        let _guard = self.guard()?;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl HistoryRecorder for JsonlHistoryStore {
    fn append(&self, entry: RequestHistoryEntry) -> Result<(), HistoryError> {
        let _guard = self.guard()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        file.flush()?;
        drop(file);

        let evicted = self.enforce_limit()?;
        if evicted > 0 {
            log::debug!("Evicted {} old history entries", evicted);
        }
        Ok(())
    }

    fn load(&self) -> Result<Vec<RequestHistoryEntry>, HistoryError> {
        let _guard = self.guard()?;
        self.read_entries()
    }

    fn modify(
        &self,
        f: &mut dyn FnMut(&mut Vec<RequestHistoryEntry>) -> bool,
    ) -> Result<(), HistoryError> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;
        if f(&mut entries) {
            self.write_entries(&entries)?;
        }
        Ok(())
    }

    fn sanitizes_headers(&self) -> bool {
        self.config.sanitize_sensitive_headers
    }
}
