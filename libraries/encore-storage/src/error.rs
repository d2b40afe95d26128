//! Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored row cannot be turned back into a snapshot
    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(err.to_string())
    }
}

impl From<StorageError> for encore_core::EncoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Corrupt(msg) => encore_core::EncoreError::corrupt_snapshot(msg),
            StorageError::SerializationError(e) => encore_core::EncoreError::corrupt_snapshot(e.to_string()),
            other => encore_core::EncoreError::storage(other.to_string()),
        }
    }
}
