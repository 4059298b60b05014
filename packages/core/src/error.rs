//! Store Error Types
//!
//! `StoreError` is the failure signal of every store operation. Recoverable
//! conditions (missing node, stale snapshot) are not errors; they are reported
//! through `Option` and `MutationOutcome`.

use crate::db::DatabaseError;
use crate::models::ValidationError;
use thiserror::Error;

/// Convenience alias used throughout the store
pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database operation failed (connection, constraint, SQL)
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Input rejected before touching the database
    #[error("Node validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Tags or metadata could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<libsql::Error> for StoreError {
    fn from(err: libsql::Error) -> Self {
        Self::Database(DatabaseError::LibsqlError(err))
    }
}
