//! Shared constants used across pastebin crates.

/// Default API port.
pub const DEFAULT_PORT: u16 = 38520;

/// Default maximum paste size in bytes. Larger content is truncated, not rejected.
pub const DEFAULT_MAX_PASTE_SIZE: usize = 100 * 1024;

/// Length of a generated short identifier.
pub const SHORT_ID_LEN: usize = 6;

/// Alphabet short identifiers are drawn from.
pub const SHORT_ID_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default number of insert attempts before ID generation gives up.
pub const DEFAULT_MAX_ID_ATTEMPTS: usize = 20;

/// Title stored when a paste is created without one.
pub const DEFAULT_TITLE: &str = "Untitled paste";

/// Language tag stored when a paste is created without one.
pub const DEFAULT_LANGUAGE: &str = "plain";

/// Default number of rows returned by the recent-pastes listing.
pub const DEFAULT_RECENT_LIMIT: usize = 5;
/// Upper bound for recent listing and search page sizes.
pub const MAX_PAGE_SIZE: usize = 100;
/// Default search page size.
pub const DEFAULT_SEARCH_PER_PAGE: usize = 20;

/// File name for the redb database within the configured DB directory.
pub const REDB_FILE_NAME: &str = "pastes.redb";
