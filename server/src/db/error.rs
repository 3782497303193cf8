//! Store Error Types

use thiserror::Error;

/// Errors raised by the persistence layer.
///
/// Absence on lookups is `Ok(None)`, not an error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record addressed by a write, or a row it references, does not exist.
    #[error("Record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// Any other database failure.
    #[error("Database error")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Self::Conflict(db_err.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => Self::NotFound,
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Database(other),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
