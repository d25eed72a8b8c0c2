//! Placeholder substitution.
//!
//! Replaces `{{name}}` placeholders (whitespace allowed inside the braces) with
//! values from a variable map. Keys are matched literally, substitution is a
//! single pass, and placeholders without a matching key are left verbatim so
//! a request can stay partially templated.

use once_cell::sync::Lazy;
use regex::{Captures, Regex, RegexBuilder};
use std::collections::HashMap;
use thiserror::Error;

/// Marker that opens a placeholder.
pub const PLACEHOLDER_OPEN: &str = "{{";

/// Upper bound for the compiled alternation of all variable names.
const PATTERN_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Cached regex matching any `{{...}}` placeholder, used for inspection only.
static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("Failed to compile placeholder regex"));

/// Errors that can occur while resolving placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarError {
    /// The pattern built from the variable names could not be compiled.
    #[error("Failed to build variable pattern: {0}")]
    Pattern(String),
}

/// Resolves every `{{ key }}` placeholder whose key is present in `variables`.
///
/// Never fails: if the variable pattern cannot be built, the input is
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use rest_workbench::variables::resolve;
/// use std::collections::HashMap;
///
/// let mut vars = HashMap::new();
/// vars.insert("A".to_string(), "1".to_string());
///
/// assert_eq!(resolve("{{A}}-{{ B }}", &vars), "1-{{ B }}");
/// ```
pub fn resolve(text: &str, variables: &HashMap<String, String>) -> String {
    resolve_within(text, variables, PATTERN_SIZE_LIMIT)
}

fn resolve_within(text: &str, variables: &HashMap<String, String>, size_limit: usize) -> String {
    match try_resolve_within(text, variables, size_limit) {
        Ok(resolved) => resolved,
        Err(e) => {
            log::warn!("Variable resolution skipped: {}", e);
            text.to_string()
        }
    }
}

/// Fallible form of [`resolve`].
///
/// All keys are folded into one alternation and applied in a single
/// `replace_all`, so a substituted value is never scanned again.
pub fn try_resolve(text: &str, variables: &HashMap<String, String>) -> Result<String, VarError> {
    try_resolve_within(text, variables, PATTERN_SIZE_LIMIT)
}

fn try_resolve_within(
    text: &str,
    variables: &HashMap<String, String>,
    size_limit: usize,
) -> Result<String, VarError> {
    // Fast path: nothing to do without markers or variables
    if variables.is_empty() || !text.contains(PLACEHOLDER_OPEN) {
        return Ok(text.to_string());
    }

    let pattern = build_pattern(variables, size_limit)?;

    let resolved = pattern.replace_all(text, |caps: &Captures| {
        let key = &caps[1];
        match variables.get(key) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    });

    Ok(resolved.into_owned())
}

/// Builds `\{\{\s*(k1|k2|...)\s*\}\}` from the escaped variable names.
fn build_pattern(
    variables: &HashMap<String, String>,
    size_limit: usize,
) -> Result<Regex, VarError> {
    let mut keys: Vec<&str> = variables.keys().map(String::as_str).collect();
    // Longest first so a key never shadows a longer key sharing its prefix
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternation = keys
        .iter()
        .map(|key| regex::escape(key))
        .collect::<Vec<_>>()
        .join("|");

    RegexBuilder::new(&format!(r"\{{\{{\s*({})\s*\}}\}}", alternation))
        .size_limit(size_limit)
        .build()
        .map_err(|e| VarError::Pattern(e.to_string()))
}

/// Returns `true` if the text contains a placeholder marker.
pub fn contains_placeholder(text: &str) -> bool {
    text.contains(PLACEHOLDER_OPEN)
}

/// Lists the distinct, trimmed names of all `{{...}}` placeholders in order
/// of first appearance.
pub fn placeholder_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in PLACEHOLDER_REGEX.captures_iter(text) {
        let name = cap[1].trim();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Placeholder names in `text` that have no entry in `variables`.
pub fn unresolved_names(text: &str, variables: &HashMap<String, String>) -> Vec<String> {
    placeholder_names(text)
        .into_iter()
        .filter(|name| !variables.contains_key(name))
        .collect()
}
