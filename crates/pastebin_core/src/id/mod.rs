//! Short identifier generation with collision avoidance.

use crate::constants::{DEFAULT_MAX_ID_ATTEMPTS, SHORT_ID_ALPHABET, SHORT_ID_LEN};
use crate::error::AppError;
use crate::store::PasteStore;
use chrono::{DateTime, Utc};
use rand::Rng;

/// Draw a candidate id: [`SHORT_ID_LEN`] symbols sampled uniformly from
/// [`SHORT_ID_ALPHABET`].
pub fn random_short_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SHORT_ID_LEN)
        .map(|_| char::from(SHORT_ID_ALPHABET[rng.gen_range(0..SHORT_ID_ALPHABET.len())]))
        .collect()
}

/// Whether `candidate` has the shape of a short id.
pub fn is_valid_short_id(candidate: &str) -> bool {
    candidate.len() == SHORT_ID_LEN && is_short_id_alphabet(candidate)
}

/// Whether every byte of `candidate` is in the short id alphabet.
pub fn is_short_id_alphabet(candidate: &str) -> bool {
    candidate.bytes().all(|byte| byte.is_ascii_alphanumeric())
}

/// Produces short ids that are free in the store at the time of the check.
///
/// The check does not reserve the id. Callers insert afterwards and must handle
/// [`AppError::DuplicateKey`] from the store when another writer won the race.
#[derive(Debug, Clone, Copy)]
pub struct IdGenerator {
    max_attempts: usize,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ID_ATTEMPTS)
    }
}

impl IdGenerator {
    /// Create a generator that gives up after `max_attempts` colliding candidates.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Generate an id that no live paste currently owns.
    ///
    /// # Returns
    /// A fresh short id.
    ///
    /// # Errors
    /// - [`AppError::GenerationExhausted`] after `max_attempts` collisions.
    /// - Storage errors from the existence check, unchanged.
    pub fn generate(&self, store: &dyn PasteStore, now: DateTime<Utc>) -> Result<String, AppError> {
        self.generate_with(&mut rand::thread_rng(), store, now)
    }

    /// Draw a single candidate and check it against the store.
    ///
    /// Returns `None` when a live paste already owns the candidate. Callers
    /// that run their own retry loop use this so one budget covers both
    /// collisions and lost insert races.
    ///
    /// # Errors
    /// Storage errors from the existence check, unchanged.
    pub fn candidate(
        &self,
        store: &dyn PasteStore,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        Self::candidate_with(&mut rand::thread_rng(), store, now)
    }

    fn candidate_with<R: Rng + ?Sized>(
        rng: &mut R,
        store: &dyn PasteStore,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        let candidate = random_short_id(rng);
        if store.contains_live(&candidate, now)? {
            return Ok(None);
        }
        Ok(Some(candidate))
    }

    /// [`IdGenerator::generate`] with an explicit randomness source.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        store: &dyn PasteStore,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        for attempt in 1..=self.max_attempts {
            if let Some(candidate) = Self::candidate_with(rng, store, now)? {
                return Ok(candidate);
            }
            tracing::debug!(attempt, "Short id collision; retrying");
        }

        tracing::warn!(
            attempts = self.max_attempts,
            "Short id generation exhausted its attempts"
        );
        Err(AppError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}
