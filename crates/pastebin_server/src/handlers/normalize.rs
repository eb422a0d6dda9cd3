//! Shared normalization helpers for optional request fields.

use axum::http::HeaderMap;

/// Header carrying the opaque per-browser session token for view counting.
pub(crate) const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Empty or whitespace-only values are treated as absent.
pub(super) fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Session token from the request headers, if present and readable.
pub(super) fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(SESSION_TOKEN_HEADER)?.to_str().ok()?;
    normalize_optional(Some(raw.to_string()))
}
