//! Errors raised by the key-material stores.

use thiserror::Error;

/// Errors that can occur when interacting with a key-material store.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error occurred when interacting with the sled database.
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
}

/// Result type for store operations.
pub type DbResult<T> = Result<T, DbError>;
