use thiserror::Error;

use crate::models::domain::ParseEnumError;
use crate::services::repository::StoreError;
use crate::services::storage::StorageError;

/// Errors returned by the account coordinator, the match engine and the task board
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Unknown value: {0}")]
    UnknownValue(#[from] ParseEnumError),

    #[error("Empty value: {0}")]
    EmptyValue(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unhandled action: {0}")]
    UnhandledAction(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Exceeded the maximum of {0} tasks")]
    TaskLimit(i64),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("File storage error: {0}")]
    FileStorage(#[from] StorageError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServiceError::NotFound("record"),
            StoreError::UniqueViolation(msg) => ServiceError::Duplicate(msg),
            StoreError::ForeignKeyViolation(msg) => ServiceError::Validation(msg),
            other => ServiceError::Store(other),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Map a store lookup error to a NotFound naming the missing entity
pub(crate) fn not_found_as(entity: &'static str) -> impl FnOnce(StoreError) -> ServiceError {
    move |err| match err {
        StoreError::NotFound => ServiceError::NotFound(entity),
        other => other.into(),
    }
}
