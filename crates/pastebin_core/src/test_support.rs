//! Shared test-only helpers for pastebin_core.

use crate::models::paste::Paste;
use crate::store::{MemoryPasteStore, PasteStore, RedbPasteStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tempfile::TempDir;

/// Creates an isolated redb store and returns it with its temp dir.
///
/// Keep the [`TempDir`] alive for the full test to preserve the backing file.
///
/// # Panics
/// Panics if temp-dir creation or database initialization fails.
pub(crate) fn setup_temp_store() -> (RedbPasteStore, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let store = RedbPasteStore::open(temp_dir.path().to_str().expect("db path")).expect("store");
    (store, temp_dir)
}

/// Runs `check` once against each backend.
///
/// The temp dir for the redb backend is dropped after `check` returns.
pub(crate) fn for_each_backend(mut check: impl FnMut(Arc<dyn PasteStore>)) {
    check(Arc::new(MemoryPasteStore::default()));

    let (store, _temp_dir) = setup_temp_store();
    check(Arc::new(store));
}

/// A live paste with no expiry, created at `now`.
pub(crate) fn sample_paste(short_id: &str, title: &str, now: DateTime<Utc>) -> Paste {
    Paste::new(
        short_id.to_string(),
        Some(title.to_string()),
        format!("content of {}", title),
        None,
        now,
        None,
    )
}

/// A paste created at `created_at` that expires `ttl` later.
pub(crate) fn expiring_paste(
    short_id: &str,
    title: &str,
    created_at: DateTime<Utc>,
    ttl: Duration,
) -> Paste {
    let mut paste = sample_paste(short_id, title, created_at);
    paste.expires_at = Some(created_at + ttl);
    paste
}
