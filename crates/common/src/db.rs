//! Storage error classification shared by repositories

use crate::error::Error;
use thiserror::Error;

/// Failures a repository reports beyond plain driver errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("{0} not found")]
    Missing(&'static str),

    #[error("{0} already in use")]
    DuplicateKey(&'static str),

    #[error("Database error: {0}")]
    Connection(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Classify a failed insert: unique violations become `DuplicateKey(key)`
    pub fn from_insert(err: sqlx::Error, key: &'static str) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() => Self::DuplicateKey(key),
            _ => Self::Connection(err),
        }
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Missing(_) => Error::NotFound(err.to_string()),
            RepositoryError::DuplicateKey(_) => Error::Conflict(err.to_string()),
            RepositoryError::Connection(e) => Error::Database(e),
        }
    }
}
