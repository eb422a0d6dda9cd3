//! Core storage engine for the pastebin (config, models, storage, search).

/// Injectable time sources.
pub mod clock;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Application error types (storage/domain).
pub mod error;
/// Expiration choices and expiry resolution.
pub mod expiration;
/// Short identifier generation.
pub mod id;
/// Data models for API requests and persistence.
pub mod models;
/// Keyword matching and pagination.
pub mod search;
/// Paste service facade over the store.
pub mod service;
/// Store interface and backends.
pub mod store;
/// Per-session view counting.
pub mod views;

#[cfg(test)]
pub(crate) mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use constants::DEFAULT_PORT;
pub use error::AppError;
pub use expiration::ExpirationChoice;
pub use service::Pastebin;
pub use store::{open_store, PasteStore};
pub use views::ViewCounter;
