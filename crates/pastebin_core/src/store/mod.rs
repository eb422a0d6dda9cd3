//! Keyed paste storage behind a single interface with swappable backends.

/// Process-local backend.
pub mod memory;
/// Durable redb backend.
pub mod redb_store;
/// redb table definitions.
pub mod tables;

mod helpers;

pub use self::helpers::reverse_timestamp_key;
pub use self::memory::MemoryPasteStore;
pub use self::redb_store::RedbPasteStore;

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::models::paste::Paste;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Storage contract every backend satisfies.
///
/// All operations may block on I/O. Operations that take `now` treat rows with
/// `expires_at < now` as absent and remove them as a side effect.
pub trait PasteStore: Send + Sync {
    /// Short backend label for logs.
    fn backend_name(&self) -> &'static str;

    /// Persist a new row, all or nothing.
    ///
    /// # Errors
    /// [`AppError::DuplicateKey`] when a live row already owns `paste.short_id`.
    /// An expired occupant is evicted and replaced instead.
    fn insert(&self, paste: &Paste, now: DateTime<Utc>) -> Result<(), AppError>;

    /// Whether a live row owns `short_id`. Does not evict.
    fn contains_live(&self, short_id: &str, now: DateTime<Utc>) -> Result<bool, AppError>;

    /// Fetch a live row, evicting it if it has expired.
    fn get(&self, short_id: &str, now: DateTime<Utc>) -> Result<Option<Paste>, AppError>;

    /// Up to `limit` live rows, newest first.
    fn list_recent(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<Paste>, AppError>;

    /// Every live row matching the lowercased keyword, newest first.
    fn search(&self, query_lower: &str, now: DateTime<Utc>) -> Result<Vec<Paste>, AppError>;

    /// Atomically add one view.
    ///
    /// # Returns
    /// The view count after the increment.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when the row is missing or expired.
    fn increment_view(&self, short_id: &str, now: DateTime<Utc>) -> Result<u64, AppError>;

    /// Physically remove a row regardless of expiry.
    fn delete(&self, short_id: &str) -> Result<bool, AppError>;

    /// Remove every expired row.
    ///
    /// # Returns
    /// Number of rows removed.
    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
}

/// Open the backend selected by `config`.
///
/// # Errors
/// Returns an error when the durable backend cannot be opened or initialized.
pub fn open_store(config: &Config) -> Result<Arc<dyn PasteStore>, AppError> {
    let store: Arc<dyn PasteStore> = match config.storage_backend {
        StorageBackend::Redb => Arc::new(RedbPasteStore::open(&config.db_path)?),
        StorageBackend::Memory => Arc::new(MemoryPasteStore::default()),
    };
    tracing::info!(backend = store.backend_name(), "Paste store ready");
    Ok(store)
}

#[cfg(test)]
mod tests;
