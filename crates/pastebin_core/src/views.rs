//! Per-session view counting on top of the store's plain counter.

use crate::error::AppError;
use crate::service::Pastebin;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Default number of sessions remembered before the oldest is forgotten.
pub const DEFAULT_MAX_TRACKED_SESSIONS: usize = 100_000;

/// Result of a per-session view increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The view was counted; carries the new total.
    Counted(u64),
    /// This session already counted a view for the paste.
    AlreadyCounted,
}

#[derive(Default)]
struct SessionState {
    seen_by_session: HashMap<String, HashSet<String>>,
    arrival_order: VecDeque<String>,
}

/// Issues at most one [`Pastebin::increment_view`] per (session, paste) pair.
///
/// The session token is opaque and carries no identity. Memory is bounded by
/// forgetting the oldest sessions first; a forgotten session may count again.
pub struct ViewCounter {
    pastebin: Pastebin,
    max_sessions: usize,
    inner: Mutex<SessionState>,
}

impl ViewCounter {
    pub fn new(pastebin: Pastebin) -> Self {
        Self::with_capacity(pastebin, DEFAULT_MAX_TRACKED_SESSIONS)
    }

    pub fn with_capacity(pastebin: Pastebin, max_sessions: usize) -> Self {
        Self {
            pastebin,
            max_sessions: max_sessions.max(1),
            inner: Mutex::new(SessionState::default()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, SessionState>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::StorageUnavailable("view session state poisoned".to_string()))
    }

    /// Count a view unless `session_token` already counted one for `short_id`.
    ///
    /// The pair is reserved before the store call so concurrent requests from
    /// the same session count once; the reservation is dropped if the store
    /// call fails.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when the paste is missing or expired; storage errors
    /// unchanged.
    pub fn increment_once_per_session(
        &self,
        short_id: &str,
        session_token: &str,
    ) -> Result<ViewOutcome, AppError> {
        if !self.reserve(short_id, session_token)? {
            return Ok(ViewOutcome::AlreadyCounted);
        }

        match self.pastebin.increment_view(short_id) {
            Ok(count) => Ok(ViewOutcome::Counted(count)),
            Err(err) => {
                self.release(short_id, session_token)?;
                Err(err)
            }
        }
    }

    /// Number of sessions currently remembered.
    pub fn tracked_sessions(&self) -> Result<usize, AppError> {
        Ok(self.state()?.seen_by_session.len())
    }

    fn reserve(&self, short_id: &str, session_token: &str) -> Result<bool, AppError> {
        let mut state = self.state()?;
        if let Some(seen) = state.seen_by_session.get_mut(session_token) {
            return Ok(seen.insert(short_id.to_string()));
        }

        while state.seen_by_session.len() >= self.max_sessions {
            let Some(oldest) = state.arrival_order.pop_front() else {
                break;
            };
            state.seen_by_session.remove(&oldest);
        }
        state
            .seen_by_session
            .insert(session_token.to_string(), HashSet::from([short_id.to_string()]));
        state.arrival_order.push_back(session_token.to_string());
        Ok(true)
    }

    fn release(&self, short_id: &str, session_token: &str) -> Result<(), AppError> {
        let mut state = self.state()?;
        if let Some(seen) = state.seen_by_session.get_mut(session_token) {
            seen.remove(short_id);
        }
        Ok(())
    }
}
