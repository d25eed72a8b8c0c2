//! HTTP Basic authentication (RFC 7617).

use super::{detail_str, AuthError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

/// Encodes username and password into a Basic authentication header value.
///
/// # Examples
///
/// ```
/// use rest_workbench::auth::basic::basic_auth;
///
/// let auth_header = basic_auth("user", "pass123");
/// assert_eq!(auth_header, "Basic dXNlcjpwYXNzMTIz");
/// ```
pub fn basic_auth(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    let encoded = STANDARD.encode(credentials.as_bytes());
    format!("Basic {}", encoded)
}

/// Reads `username` and `password` from stored auth details.
///
/// A missing password is treated as empty; a missing username is an error.
pub fn credentials_from_details(details: &Value) -> Result<(String, String), AuthError> {
    let username = detail_str(details, &["username", "user"])
        .ok_or_else(|| AuthError::MissingCredentials("basic auth requires a username".into()))?;
    let password = detail_str(details, &["password"]).unwrap_or_default();
    Ok((username, password))
}
