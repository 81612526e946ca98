//! Authentication domain errors

use thiserror::Error;

/// Authentication-specific domain errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Password hashing failed")]
    HashingFailed,

    #[error("Stored password hash is malformed")]
    MalformedHash,

    #[error("Invalid credentials provided")]
    InvalidCredentials,
}
