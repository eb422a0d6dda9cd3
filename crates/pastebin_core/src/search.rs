//! Keyword matching and pagination for paste search.
//!
//! Matching is plain case-insensitive substring containment over the short id,
//! title, and content. Ranking is recency only.

use crate::constants::{DEFAULT_SEARCH_PER_PAGE, MAX_PAGE_SIZE, SHORT_ID_LEN};
use crate::id::is_short_id_alphabet;
use crate::models::paste::Paste;

/// Whether `query` has the shape that warrants a direct key lookup first.
pub fn is_exact_id_candidate(query: &str) -> bool {
    !query.is_empty() && query.len() <= SHORT_ID_LEN && is_short_id_alphabet(query)
}

/// Whether `paste` matches an already lowercased keyword.
pub fn matches_query(paste: &Paste, query_lower: &str) -> bool {
    contains_case_insensitive(&paste.short_id, query_lower)
        || contains_case_insensitive(&paste.title, query_lower)
        || contains_case_insensitive(&paste.content, query_lower)
}

pub(crate) fn contains_case_insensitive(haystack: &str, query_lower: &str) -> bool {
    if query_lower.is_empty() {
        return true;
    }
    if query_lower.is_ascii() {
        let needle = query_lower.as_bytes();
        let hay = haystack.as_bytes();
        if needle.len() > hay.len() {
            return false;
        }
        return hay.windows(needle.len()).any(|window| {
            window
                .iter()
                .map(u8::to_ascii_lowercase)
                .eq(needle.iter().copied())
        });
    }
    haystack.to_lowercase().contains(query_lower)
}

/// Normalized page request.
///
/// `page` is clamped to at least 1 and `per_page` to `1..=MAX_PAGE_SIZE`;
/// out-of-range values are corrected rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_SEARCH_PER_PAGE,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<usize>, per_page: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_SEARCH_PER_PAGE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Index of the first row on this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Take this page's slice out of the full ordered match list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.per_page)
            .collect()
    }
}
