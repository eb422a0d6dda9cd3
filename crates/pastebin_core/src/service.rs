//! Paste operations exposed to transports: create, read, list, search, views.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::constants::{DEFAULT_MAX_PASTE_SIZE, MAX_PAGE_SIZE};
use crate::error::AppError;
use crate::id::{is_valid_short_id, IdGenerator};
use crate::models::paste::{truncate_to_bound, NewPaste, Paste, PasteSummary, SearchResults};
use crate::search::{is_exact_id_candidate, Pagination};
use crate::store::PasteStore;
use std::sync::Arc;

/// Paste service over an injected store and clock.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct Pastebin {
    store: Arc<dyn PasteStore>,
    clock: Arc<dyn Clock>,
    ids: IdGenerator,
    max_paste_size: usize,
}

impl Pastebin {
    /// Build a service with the wall clock and default limits.
    pub fn new(store: Arc<dyn PasteStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            ids: IdGenerator::default(),
            max_paste_size: DEFAULT_MAX_PASTE_SIZE,
        }
    }

    /// Build a service using the limits from `config`.
    pub fn from_config(store: Arc<dyn PasteStore>, config: &Config) -> Self {
        Self::new(store)
            .with_max_paste_size(config.max_paste_size)
            .with_id_generator(IdGenerator::new(config.max_id_attempts))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_max_paste_size(mut self, max_paste_size: usize) -> Self {
        self.max_paste_size = max_paste_size.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn PasteStore> {
        &self.store
    }

    pub fn max_paste_size(&self) -> usize {
        self.max_paste_size
    }

    /// Create and persist a paste.
    ///
    /// Content longer than the size bound is truncated. Generated ids that are
    /// already taken, or that lose an insert race, are replaced with fresh ones.
    /// Both kinds of retry draw from the generator's single attempt bound.
    ///
    /// # Returns
    /// The stored paste.
    ///
    /// # Errors
    /// - [`AppError::ContentRequired`] for blank content, before any storage access.
    /// - [`AppError::BadRequest`] for a malformed caller-supplied short id.
    /// - [`AppError::DuplicateKey`] when a caller-supplied short id is taken.
    /// - [`AppError::GenerationExhausted`] when no free id could be allocated.
    /// - Storage errors, unchanged.
    pub fn create_paste(&self, request: NewPaste) -> Result<Paste, AppError> {
        if request.content.trim().is_empty() {
            return Err(AppError::ContentRequired);
        }
        if let Some(ref short_id) = request.short_id {
            if !is_valid_short_id(short_id) {
                return Err(AppError::BadRequest(format!(
                    "Invalid short id '{}'",
                    short_id
                )));
            }
        }

        let NewPaste {
            title,
            mut content,
            language,
            expiration,
            short_id,
        } = request;

        let original_len = content.len();
        if truncate_to_bound(&mut content, self.max_paste_size) {
            tracing::debug!(
                original_len,
                stored_len = content.len(),
                "Truncated oversized paste content"
            );
        }

        let created_at = self.clock.now();
        let expires_at = expiration.resolve(created_at);

        if let Some(short_id) = short_id {
            let paste = Paste::new(short_id, title, content, language, created_at, expires_at);
            self.store.insert(&paste, created_at)?;
            return Ok(paste);
        }

        let mut paste = Paste::new(
            String::new(),
            title,
            content,
            language,
            created_at,
            expires_at,
        );
        let max_attempts = self.ids.max_attempts();
        for attempt in 1..=max_attempts {
            let Some(candidate) = self.ids.candidate(self.store.as_ref(), created_at)? else {
                tracing::debug!(attempt, "Short id collision; retrying");
                continue;
            };
            paste.short_id = candidate;
            match self.store.insert(&paste, created_at) {
                Ok(()) => {
                    tracing::info!(
                        short_id = %paste.short_id,
                        expiration = %expiration,
                        content_len = paste.content.len(),
                        "Created paste"
                    );
                    return Ok(paste);
                }
                Err(AppError::DuplicateKey(taken)) => {
                    tracing::debug!(
                        attempt,
                        short_id = %taken,
                        "Lost short id insert race; retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        tracing::warn!(attempts = max_attempts, "Giving up on paste insert");
        Err(AppError::GenerationExhausted {
            attempts: max_attempts,
        })
    }

    /// Fetch a live paste.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when the paste is missing or expired.
    pub fn get_paste(&self, short_id: &str) -> Result<Paste, AppError> {
        self.store
            .get(short_id, self.clock.now())?
            .ok_or(AppError::NotFound)
    }

    /// Fetch only the content body of a live paste.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when the paste is missing or expired.
    pub fn get_raw_content(&self, short_id: &str) -> Result<String, AppError> {
        Ok(self.get_paste(short_id)?.content)
    }

    /// Count one view. Every call counts; per-session deduplication lives in
    /// [`crate::views::ViewCounter`].
    ///
    /// # Returns
    /// The updated view count.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when the paste is missing or expired.
    pub fn increment_view(&self, short_id: &str) -> Result<u64, AppError> {
        self.store.increment_view(short_id, self.clock.now())
    }

    /// Newest live pastes, without content.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<PasteSummary>, AppError> {
        let limit = limit.min(MAX_PAGE_SIZE);
        Ok(self
            .store
            .list_recent(limit, self.clock.now())?
            .iter()
            .map(PasteSummary::from)
            .collect())
    }

    /// Search live pastes.
    ///
    /// A query shaped like a short id is first tried as a direct lookup; a hit
    /// is returned alone with `total == 1`. Otherwise all keyword matches are
    /// ordered newest first and paginated.
    ///
    /// # Errors
    /// [`AppError::QueryRequired`] when the trimmed query is empty.
    pub fn search_pastes(
        &self,
        query: &str,
        pagination: Pagination,
    ) -> Result<SearchResults, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::QueryRequired);
        }

        let now = self.clock.now();
        if is_exact_id_candidate(query) {
            if let Some(paste) = self.store.get(query, now)? {
                return Ok(SearchResults {
                    results: vec![PasteSummary::from(&paste)],
                    total: 1,
                    page: 1,
                    per_page: pagination.per_page,
                });
            }
        }

        let matches = self.store.search(&query.to_lowercase(), now)?;
        let total = matches.len();
        let results = pagination
            .slice(matches)
            .iter()
            .map(PasteSummary::from)
            .collect();

        Ok(SearchResults {
            results,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
        })
    }

    /// Remove a paste regardless of expiry.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when no row exists.
    pub fn delete_paste(&self, short_id: &str) -> Result<(), AppError> {
        if self.store.delete(short_id)? {
            tracing::info!(short_id, "Deleted paste");
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    /// Reclaim storage held by expired pastes nobody has touched.
    ///
    /// # Returns
    /// Number of rows removed.
    pub fn sweep_expired(&self) -> Result<usize, AppError> {
        let removed = self.store.sweep_expired(self.clock.now())?;
        tracing::info!(
            removed,
            backend = self.store.backend_name(),
            "Expiry sweep finished"
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests;
