//! Application error surface
//!
//! Every use case returns [`ApplicationError`]. The presentation layer maps
//! each variant to exactly one HTTP status.

use thiserror::Error;

use super::validation::FieldError;
use crate::domain::auth::AuthError;
use crate::domain::storage::StorageError;
use crate::domain::store::StoreError;
use crate::infrastructure::auth::CapabilityError;

#[derive(Error, Debug, Clone)]
pub enum ApplicationError {
    #[error("rate limit exceeded ({scope})")]
    RateLimited { scope: String, retry_after: u64 },

    /// The caller's version is stale; re-fetch and retry
    #[error("edit conflict")]
    EditConflict,

    #[error("scroll content already delivered")]
    AlreadyDelivered,

    /// Surfaced exactly like a missing record
    #[error("invalid upload capability")]
    InvalidCapability,

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    #[error("validation failed")]
    Validation { errors: Vec<FieldError> },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("content exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,

    #[error("authentication required")]
    AuthenticationRequired,

    #[error("account not activated")]
    InactiveAccount,

    #[error("account already activated")]
    AlreadyActivated,

    #[error("not permitted")]
    Forbidden,

    /// A store call failed; any open unit of work has been rolled back
    #[error("transaction failed: {0}")]
    TransactionFailure(StoreError),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::Internal(message.to_string())
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            errors: vec![FieldError::new(field, message)],
        }
    }
}

impl From<StoreError> for ApplicationError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => ApplicationError::not_found("record"),
            StoreError::EditConflict => ApplicationError::EditConflict,
            other => ApplicationError::TransactionFailure(other),
        }
    }
}

impl From<StorageError> for ApplicationError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::PayloadTooLarge { limit } => ApplicationError::PayloadTooLarge { limit },
            StorageError::InvalidUtf8 => {
                ApplicationError::InvalidContent("content must be valid UTF-8 text".to_string())
            }
            StorageError::Body(reason) => ApplicationError::BadRequest(reason),
            StorageError::NotFound(_) => ApplicationError::not_found("content"),
            StorageError::AlreadyExists(_) => ApplicationError::AlreadyDelivered,
            other => ApplicationError::Storage(other),
        }
    }
}

impl From<AuthError> for ApplicationError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApplicationError::InvalidCredentials,
            other => ApplicationError::internal(other),
        }
    }
}

impl From<CapabilityError> for ApplicationError {
    fn from(_: CapabilityError) -> Self {
        ApplicationError::InvalidCapability
    }
}
