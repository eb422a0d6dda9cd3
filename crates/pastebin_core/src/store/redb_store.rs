//! Paste storage backed by redb.
//!
//! redb serializes write transactions, so the uniqueness check in
//! [`RedbPasteStore::insert`] and the read-modify-write in
//! [`RedbPasteStore::increment_view`] cannot interleave with other writers.

use super::helpers::{decode_paste, encode_paste, reverse_timestamp_key};
use super::tables::{PASTES, PASTES_BY_CREATED};
use super::PasteStore;
use crate::constants::REDB_FILE_NAME;
use crate::error::AppError;
use crate::models::paste::Paste;
use crate::search::matches_query;
use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use std::path::Path;
use std::sync::Arc;

/// Durable paste store over a single redb file.
pub struct RedbPasteStore {
    db: Arc<redb::Database>,
}

impl RedbPasteStore {
    /// Open (or create) the database under the `path` directory and make sure
    /// the tables exist. Safe to call on an already initialized directory.
    ///
    /// # Errors
    /// Returns [`AppError::StorageUnavailable`] when the directory cannot be
    /// created or another process holds the database open.
    pub fn open(path: &str) -> Result<Self, AppError> {
        let dir = Path::new(path);
        std::fs::create_dir_all(dir).map_err(|err| {
            AppError::StorageUnavailable(format!(
                "Failed to create data directory '{}': {}",
                dir.display(),
                err
            ))
        })?;

        let file = dir.join(REDB_FILE_NAME);
        let db = match redb::Database::create(&file) {
            Ok(db) => db,
            Err(redb::DatabaseError::DatabaseAlreadyOpen) => {
                return Err(AppError::StorageUnavailable(format!(
                    "Database '{}' is already open in another process.\n\
                    Stop the other instance or set DB_PATH to a different location.",
                    file.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };

        Self::from_shared(Arc::new(db))
    }

    /// Wrap an already open database, creating the tables if needed.
    ///
    /// # Errors
    /// Returns an error when table initialization fails.
    pub fn from_shared(db: Arc<redb::Database>) -> Result<Self, AppError> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(PASTES)?;
        write_txn.open_table(PASTES_BY_CREATED)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Remove the given rows if they are still expired at `now`.
    ///
    /// Each candidate is re-read inside the write transaction so a row replaced
    /// after the caller's scan is left alone.
    fn evict_expired(
        &self,
        short_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        if short_ids.is_empty() {
            return Ok(0);
        }

        let write_txn = self.db.begin_write()?;
        let mut evicted = 0;
        {
            let mut pastes = write_txn.open_table(PASTES)?;
            let mut by_created = write_txn.open_table(PASTES_BY_CREATED)?;

            for short_id in short_ids {
                let Some(guard) = pastes.get(short_id.as_str())? else {
                    continue;
                };
                let paste = decode_paste(guard.value())?;
                drop(guard);
                if !paste.is_expired(now) {
                    continue;
                }
                let recency_key = reverse_timestamp_key(paste.created_at);
                let _ = by_created.remove((recency_key, short_id.as_str()))?;
                let _ = pastes.remove(short_id.as_str())?;
                evicted += 1;
            }
        }
        write_txn.commit()?;

        if evicted > 0 {
            tracing::debug!(evicted, "Evicted expired pastes");
        }
        Ok(evicted)
    }

    /// Walk the recency index, newest first, passing live rows to `on_live`
    /// until it returns `false`. Expired rows are evicted afterwards.
    fn scan_recent<F>(&self, now: DateTime<Utc>, mut on_live: F) -> Result<(), AppError>
    where
        F: FnMut(Paste) -> bool,
    {
        let mut expired = Vec::new();
        {
            let read_txn = self.db.begin_read()?;
            let by_created = read_txn.open_table(PASTES_BY_CREATED)?;
            let pastes = read_txn.open_table(PASTES)?;

            for item in by_created.iter()? {
                let (key, _) = item?;
                let (_, short_id) = key.value();
                let Some(guard) = pastes.get(short_id)? else {
                    continue;
                };
                let paste = decode_paste(guard.value())?;
                if paste.is_expired(now) {
                    expired.push(paste.short_id);
                    continue;
                }
                if !on_live(paste) {
                    break;
                }
            }
        }

        self.evict_expired(&expired, now)?;
        Ok(())
    }
}

impl PasteStore for RedbPasteStore {
    fn backend_name(&self) -> &'static str {
        "redb"
    }

    fn insert(&self, paste: &Paste, now: DateTime<Utc>) -> Result<(), AppError> {
        let encoded = encode_paste(paste)?;
        let recency_key = reverse_timestamp_key(paste.created_at);
        let short_id = paste.short_id.as_str();

        let write_txn = self.db.begin_write()?;
        {
            let mut pastes = write_txn.open_table(PASTES)?;
            let mut by_created = write_txn.open_table(PASTES_BY_CREATED)?;

            if let Some(guard) = pastes.get(short_id)? {
                let occupant = decode_paste(guard.value())?;
                drop(guard);
                if !occupant.is_expired(now) {
                    return Err(AppError::DuplicateKey(paste.short_id.clone()));
                }
                tracing::debug!(short_id, "Replacing expired paste that held this short id");
                let occupant_key = reverse_timestamp_key(occupant.created_at);
                let _ = by_created.remove((occupant_key, short_id))?;
            }

            pastes.insert(short_id, encoded.as_slice())?;
            by_created.insert((recency_key, short_id), ())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn contains_live(&self, short_id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let read_txn = self.db.begin_read()?;
        let pastes = read_txn.open_table(PASTES)?;
        match pastes.get(short_id)? {
            Some(guard) => Ok(!decode_paste(guard.value())?.is_expired(now)),
            None => Ok(false),
        }
    }

    fn get(&self, short_id: &str, now: DateTime<Utc>) -> Result<Option<Paste>, AppError> {
        let paste = {
            let read_txn = self.db.begin_read()?;
            let pastes = read_txn.open_table(PASTES)?;
            let Some(guard) = pastes.get(short_id)? else {
                return Ok(None);
            };
            decode_paste(guard.value())?
        };

        if paste.is_expired(now) {
            self.evict_expired(&[paste.short_id], now)?;
            return Ok(None);
        }
        Ok(Some(paste))
    }

    fn list_recent(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<Paste>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut pastes = Vec::with_capacity(limit.min(64));
        self.scan_recent(now, |paste| {
            pastes.push(paste);
            pastes.len() < limit
        })?;
        Ok(pastes)
    }

    fn search(&self, query_lower: &str, now: DateTime<Utc>) -> Result<Vec<Paste>, AppError> {
        let mut matches = Vec::new();
        self.scan_recent(now, |paste| {
            if matches_query(&paste, query_lower) {
                matches.push(paste);
            }
            true
        })?;
        Ok(matches)
    }

    fn increment_view(&self, short_id: &str, now: DateTime<Utc>) -> Result<u64, AppError> {
        let write_txn = self.db.begin_write()?;
        let view_count = {
            let mut pastes = write_txn.open_table(PASTES)?;
            let mut by_created = write_txn.open_table(PASTES_BY_CREATED)?;

            let Some(guard) = pastes.get(short_id)? else {
                return Err(AppError::NotFound);
            };
            let mut paste = decode_paste(guard.value())?;
            drop(guard);

            if paste.is_expired(now) {
                let _ = by_created.remove((reverse_timestamp_key(paste.created_at), short_id))?;
                let _ = pastes.remove(short_id)?;
                None
            } else {
                paste.view_count = paste.view_count.saturating_add(1);
                let encoded = encode_paste(&paste)?;
                pastes.insert(short_id, encoded.as_slice())?;
                Some(paste.view_count)
            }
        };
        write_txn.commit()?;

        view_count.ok_or(AppError::NotFound)
    }

    fn delete(&self, short_id: &str) -> Result<bool, AppError> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut pastes = write_txn.open_table(PASTES)?;
            let mut by_created = write_txn.open_table(PASTES_BY_CREATED)?;

            let Some(guard) = pastes.get(short_id)? else {
                return Ok(false);
            };
            let paste = decode_paste(guard.value())?;
            drop(guard);

            let _ = by_created.remove((reverse_timestamp_key(paste.created_at), short_id))?;
            let _ = pastes.remove(short_id)?;
            true
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let expired = {
            let read_txn = self.db.begin_read()?;
            let pastes = read_txn.open_table(PASTES)?;
            let mut expired = Vec::new();
            for item in pastes.iter()? {
                let (_, value) = item?;
                let paste = decode_paste(value.value())?;
                if paste.is_expired(now) {
                    expired.push(paste.short_id);
                }
            }
            expired
        };

        self.evict_expired(&expired, now)
    }
}
