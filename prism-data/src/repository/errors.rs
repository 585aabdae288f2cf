use std::sync::PoisonError;
use thiserror::Error;
use crate::database::DatabaseError;

/// Error type for repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Query error
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    /// Lock error
    #[error("Lock error: {0}")]
    Lock(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write conflicts with current state (duplicate key, wrong status)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored value could not be mapped back to its model
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl<T> From<PoisonError<T>> for RepositoryError {
    fn from(error: PoisonError<T>) -> Self {
        RepositoryError::Lock(error.to_string())
    }
}

/// Map a driver error, turning unique and check violations into domain errors
pub(crate) fn map_sqlx_error(error: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            return RepositoryError::Conflict(db_error.message().to_string());
        }
        if db_error.is_foreign_key_violation() {
            return RepositoryError::Validation(db_error.message().to_string());
        }
        if db_error.is_check_violation() {
            return RepositoryError::Validation(db_error.message().to_string());
        }
    }
    RepositoryError::Query(error)
}
