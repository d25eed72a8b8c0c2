//! Querying and filtering of history entries.
//!
//! Every listing is newest first. Entries with equal timestamps keep the
//! most recently recorded one first.

use super::models::RequestHistoryEntry;

/// Default number of entries returned by recent-history listings.
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Cap on entries returned for a single request.
pub const REQUEST_HISTORY_LIMIT: usize = 20;

/// Cap on entries returned for a collection or workspace.
pub const GROUP_HISTORY_LIMIT: usize = 50;

/// Orders entries by `executed_at`, newest first.
///
/// `entries` is expected in recording order.
pub fn sort_newest_first(mut entries: Vec<RequestHistoryEntry>) -> Vec<RequestHistoryEntry> {
    entries.reverse();
    entries.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
    entries
}

/// The `limit` newest entries.
pub fn recent(entries: Vec<RequestHistoryEntry>, limit: usize) -> Vec<RequestHistoryEntry> {
    let mut sorted = sort_newest_first(entries);
    sorted.truncate(limit);
    sorted
}

/// Newest entries recorded for the stored request `request_id`.
pub fn by_request(entries: Vec<RequestHistoryEntry>, request_id: &str) -> Vec<RequestHistoryEntry> {
    limited(entries, REQUEST_HISTORY_LIMIT, |e| {
        e.source_request_id.as_deref() == Some(request_id)
    })
}

pub fn by_collection(
    entries: Vec<RequestHistoryEntry>,
    collection_id: &str,
) -> Vec<RequestHistoryEntry> {
    limited(entries, GROUP_HISTORY_LIMIT, |e| {
        e.collection_id.as_deref() == Some(collection_id)
    })
}

pub fn by_workspace(
    entries: Vec<RequestHistoryEntry>,
    workspace_id: &str,
) -> Vec<RequestHistoryEntry> {
    limited(entries, GROUP_HISTORY_LIMIT, |e| {
        e.workspace_id.as_deref() == Some(workspace_id)
    })
}

fn limited<F>(entries: Vec<RequestHistoryEntry>, limit: usize, keep: F) -> Vec<RequestHistoryEntry>
where
    F: Fn(&RequestHistoryEntry) -> bool,
{
    let matching = entries.into_iter().filter(|e| keep(e)).collect();
    recent(matching, limit)
}

/// Case-insensitive substring search over URL, method, request body,
/// response body and error message.
pub fn search_history(query: &str, entries: &[RequestHistoryEntry]) -> Vec<RequestHistoryEntry> {
    if query.is_empty() {
        return entries.to_vec();
    }

    let query_lower = query.to_lowercase();
    entries
        .iter()
        .filter(|entry| matches_query(entry, &query_lower))
        .cloned()
        .collect()
}

fn matches_query(entry: &RequestHistoryEntry, query_lower: &str) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(query_lower);

    contains(&entry.url)
        || contains(entry.method.as_str())
        || entry.request_body_content.as_deref().map_or(false, contains)
        || entry.response_body.as_deref().map_or(false, contains)
        || entry.error.as_deref().map_or(false, contains)
}

/// Entries with the given method (case-insensitive).
pub fn filter_by_method(method: &str, entries: &[RequestHistoryEntry]) -> Vec<RequestHistoryEntry> {
    entries
        .iter()
        .filter(|entry| entry.method.as_str().eq_ignore_ascii_case(method))
        .cloned()
        .collect()
}

pub fn filter_by_status(status_code: u16, entries: &[RequestHistoryEntry]) -> Vec<RequestHistoryEntry> {
    entries
        .iter()
        .filter(|entry| entry.response_status_code == Some(status_code))
        .cloned()
        .collect()
}

/// Failed dispatches and 4xx/5xx responses.
pub fn filter_errors(entries: &[RequestHistoryEntry]) -> Vec<RequestHistoryEntry> {
    entries.iter().filter(|e| e.is_error()).cloned().collect()
}
