//! Process-local paste storage.
//!
//! Every mutation runs under one write lock, which gives the same atomicity as
//! the durable backend for inserts, view increments, and evictions.

use super::helpers::reverse_timestamp_key;
use super::PasteStore;
use crate::error::AppError;
use crate::models::paste::Paste;
use crate::search::matches_query;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct MemoryState {
    rows: HashMap<String, Paste>,
    by_created: BTreeSet<(u64, String)>,
}

impl MemoryState {
    fn remove(&mut self, short_id: &str) -> Option<Paste> {
        let paste = self.rows.remove(short_id)?;
        self.by_created
            .remove(&(reverse_timestamp_key(paste.created_at), paste.short_id.clone()));
        Some(paste)
    }

    fn remove_if_expired(&mut self, short_ids: &[String], now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        for short_id in short_ids {
            let expired = self
                .rows
                .get(short_id)
                .is_some_and(|paste| paste.is_expired(now));
            if expired && self.remove(short_id).is_some() {
                evicted += 1;
            }
        }
        evicted
    }
}

/// In-memory paste store. Contents do not survive a restart.
#[derive(Default)]
pub struct MemoryPasteStore {
    inner: RwLock<MemoryState>,
}

impl MemoryPasteStore {
    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, AppError> {
        self.inner
            .read()
            .map_err(|_| AppError::StorageUnavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, AppError> {
        self.inner
            .write()
            .map_err(|_| AppError::StorageUnavailable("memory store lock poisoned".to_string()))
    }

    fn evict_expired(&self, short_ids: &[String], now: DateTime<Utc>) -> Result<usize, AppError> {
        if short_ids.is_empty() {
            return Ok(0);
        }
        let evicted = self.write()?.remove_if_expired(short_ids, now);
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted expired pastes");
        }
        Ok(evicted)
    }

    fn scan_recent<F>(&self, now: DateTime<Utc>, mut on_live: F) -> Result<(), AppError>
    where
        F: FnMut(&Paste) -> bool,
    {
        let mut expired = Vec::new();
        {
            let state = self.read()?;
            for (_, short_id) in &state.by_created {
                let Some(paste) = state.rows.get(short_id) else {
                    continue;
                };
                if paste.is_expired(now) {
                    expired.push(short_id.clone());
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

impl PasteStore for MemoryPasteStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn insert(&self, paste: &Paste, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut state = self.write()?;
        if let Some(occupant) = state.rows.get(&paste.short_id) {
            if !occupant.is_expired(now) {
                return Err(AppError::DuplicateKey(paste.short_id.clone()));
            }
            tracing::debug!(
                short_id = %paste.short_id,
                "Replacing expired paste that held this short id"
            );
            state.remove(&paste.short_id);
        }

        state.by_created.insert((
            reverse_timestamp_key(paste.created_at),
            paste.short_id.clone(),
        ));
        state.rows.insert(paste.short_id.clone(), paste.clone());
        Ok(())
    }

    fn contains_live(&self, short_id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        Ok(self
            .read()?
            .rows
            .get(short_id)
            .is_some_and(|paste| !paste.is_expired(now)))
    }

    fn get(&self, short_id: &str, now: DateTime<Utc>) -> Result<Option<Paste>, AppError> {
        let Some(paste) = self.read()?.rows.get(short_id).cloned() else {
            return Ok(None);
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

        let mut pastes = Vec::new();
        self.scan_recent(now, |paste| {
            pastes.push(paste.clone());
            pastes.len() < limit
        })?;
        Ok(pastes)
    }

    fn search(&self, query_lower: &str, now: DateTime<Utc>) -> Result<Vec<Paste>, AppError> {
        let mut matches = Vec::new();
        self.scan_recent(now, |paste| {
            if matches_query(paste, query_lower) {
                matches.push(paste.clone());
            }
            true
        })?;
        Ok(matches)
    }

    fn increment_view(&self, short_id: &str, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut state = self.write()?;
        match state.rows.get_mut(short_id) {
            None => return Err(AppError::NotFound),
            Some(paste) if !paste.is_expired(now) => {
                paste.view_count = paste.view_count.saturating_add(1);
                return Ok(paste.view_count);
            }
            Some(_) => {}
        }
        state.remove(short_id);
        Err(AppError::NotFound)
    }

    fn delete(&self, short_id: &str) -> Result<bool, AppError> {
        Ok(self.write()?.remove(short_id).is_some())
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut state = self.write()?;
        let expired: Vec<String> = state
            .rows
            .values()
            .filter(|paste| paste.is_expired(now))
            .map(|paste| paste.short_id.clone())
            .collect();
        Ok(state.remove_if_expired(&expired, now))
    }
}
