//! Paste records, summaries, and request/response payloads.

use crate::constants::{DEFAULT_LANGUAGE, DEFAULT_TITLE};
use crate::expiration::{is_expired_at, ExpirationChoice};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Paste row stored by every backend and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    /// Storage-assigned identity, never used for lookups.
    pub internal_id: String,
    pub short_id: String,
    pub title: String,
    pub content: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub view_count: u64,
}

/// Listing row without the content body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteSummary {
    pub short_id: String,
    pub title: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub view_count: u64,
    pub content_len: usize,
}

/// Validated input for [`crate::Pastebin::create_paste`].
#[derive(Debug, Clone, Default)]
pub struct NewPaste {
    pub title: Option<String>,
    pub content: String,
    pub language: Option<String>,
    pub expiration: ExpirationChoice,
    /// Caller-chosen short id; generated when absent.
    pub short_id: Option<String>,
}

/// Request payload for creating a paste.
#[derive(Debug, Deserialize)]
pub struct CreatePasteRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    pub language: Option<String>,
    pub expiration: Option<String>,
}

/// Query parameters for searching pastes.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// Query parameters for listing recent pastes.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// One page of search matches plus the pre-pagination match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub results: Vec<PasteSummary>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

impl Paste {
    /// Build a fresh record with defaults applied to blank title/language.
    ///
    /// # Arguments
    /// - `short_id`: External identifier.
    /// - `title`: Optional label; blank values become [`DEFAULT_TITLE`].
    /// - `content`: Body, already bounded by the caller.
    /// - `language`: Optional rendering tag; blank values become [`DEFAULT_LANGUAGE`].
    /// - `created_at`: Creation instant.
    /// - `expires_at`: Absolute expiry, `None` for pastes that never expire.
    ///
    /// # Returns
    /// A new [`Paste`] with `view_count == 0`.
    pub fn new(
        short_id: String,
        title: Option<String>,
        content: String,
        language: Option<String>,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            internal_id: Uuid::new_v4().to_string(),
            short_id,
            title: non_blank_or(title, DEFAULT_TITLE),
            content,
            language: non_blank_or(language, DEFAULT_LANGUAGE),
            created_at,
            expires_at,
            view_count: 0,
        }
    }

    /// Whether this paste is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired_at(self.expires_at, now)
    }
}

impl From<&Paste> for PasteSummary {
    fn from(value: &Paste) -> Self {
        Self {
            short_id: value.short_id.clone(),
            title: value.title.clone(),
            language: value.language.clone(),
            created_at: value.created_at,
            expires_at: value.expires_at,
            view_count: value.view_count,
            content_len: value.content.len(),
        }
    }
}

impl From<CreatePasteRequest> for NewPaste {
    fn from(value: CreatePasteRequest) -> Self {
        Self {
            title: value.title,
            content: value.content,
            language: value.language,
            expiration: ExpirationChoice::parse_or_default(value.expiration.as_deref()),
            short_id: None,
        }
    }
}

/// Non-blank values are kept verbatim, surrounding whitespace included.
fn non_blank_or(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Cut `content` down to at most `max_bytes`, backing off to a char boundary.
///
/// # Returns
/// `true` when the content was shortened.
pub fn truncate_to_bound(content: &mut String, max_bytes: usize) -> bool {
    if content.len() <= max_bytes {
        return false;
    }
    let mut cut = max_bytes;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    content.truncate(cut);
    true
}
