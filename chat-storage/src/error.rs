//! Storage error types.
//!
//! Used by the store, its observers, and converted into [`chat_core::ChatError`] at the service boundary.

use chat_core::ChatError;
use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::AlreadyExists(db.message().to_string())
            }
            sqlx::Error::RowNotFound => StorageError::NotFound(err.to_string()),
            _ => StorageError::Database(err.to_string()),
        }
    }
}

impl From<StorageError> for ChatError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => ChatError::NotFound(msg),
            StorageError::AlreadyExists(msg) => ChatError::Conflict(msg),
            StorageError::Validation(msg) => ChatError::Validation(msg),
            StorageError::Database(msg) | StorageError::Decode(msg) => ChatError::Database(msg),
        }
    }
}
