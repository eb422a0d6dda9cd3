//! Application error types for core storage and domain logic.
use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Content is required")]
    ContentRequired,

    #[error("Search query is required")]
    QueryRequired,

    /// Missing and expired pastes are reported identically.
    #[error("Paste not found or expired")]
    NotFound,

    #[error("Short id '{0}' is already taken")]
    DuplicateKey(String),

    #[error("Could not allocate a unique short id after {attempts} attempts")]
    GenerationExhausted { attempts: usize },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this error comes from the backing medium rather than the request.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable(_) | Self::Database(_) | Self::Serialization(_)
        )
    }
}

impl From<redb::DatabaseError> for AppError {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TransactionError> for AppError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TableError> for AppError {
    fn from(value: redb::TableError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::StorageError> for AppError {
    fn from(value: redb::StorageError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::CommitError> for AppError {
    fn from(value: redb::CommitError) -> Self {
        Self::Database(value.into())
    }
}
