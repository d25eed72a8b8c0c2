//! Bearer token authentication (RFC 6750).

use super::{detail_str, AuthError};
use serde_json::Value;

/// Formats a token into a Bearer authentication header value.
///
/// ```
/// use rest_workbench::auth::bearer::bearer_token;
///
/// assert_eq!(bearer_token("abc123xyz"), "Bearer abc123xyz");
/// ```
pub fn bearer_token(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Reads the token from stored auth details. OAuth2 details usually carry it
/// as `accessToken`.
pub fn token_from_details(details: &Value) -> Result<String, AuthError> {
    detail_str(details, &["token", "accessToken", "access_token"])
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| AuthError::MissingCredentials("no token in auth details".into()))
}
