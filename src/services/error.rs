use std::collections::HashMap;
use thiserror::Error;

use crate::auth::password::PasswordError;
use crate::database::DatabaseError;
use crate::filter::FilterError;
use crate::storage::StorageError;

/// Failures of a usecase, classified for the HTTP layer
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Persistence failure: {0}")]
    Persistence(DatabaseError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UniqueViolation(msg) => ServiceError::Conflict(msg),
            DatabaseError::ForeignKeyViolation(msg) => {
                tracing::warn!("Reference check failed in storage: {}", msg);
                ServiceError::NotFound("Referenced record".to_string())
            }
            DatabaseError::NotFound(msg) => ServiceError::NotFound(msg),
            other => ServiceError::Persistence(other),
        }
    }
}

impl From<FilterError> for ServiceError {
    fn from(err: FilterError) -> Self {
        ServiceError::Persistence(DatabaseError::from(err))
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}
