use thiserror::Error;

use prism_data::repository::RepositoryError;

use crate::auth::token::SecurityError;

/// Errors returned by every domain service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected by a business rule
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate key or a state transition that is no longer allowed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the action is not permitted for this caller
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Storage failure; the message is for logs, not for clients
    #[error("Repository error: {0}")]
    Repository(String),

    #[error(transparent)]
    Security(#[from] SecurityError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => ServiceError::Validation(msg),
            RepositoryError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Repository(other.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_service_errors() {
        let err: ServiceError = RepositoryError::Conflict("username taken".into()).into();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err: ServiceError = RepositoryError::NotFound("patient".into()).into();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err: ServiceError = RepositoryError::Lock("poisoned".into()).into();
        assert!(matches!(err, ServiceError::Repository(_)));
    }
}
