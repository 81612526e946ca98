//! Authentication infrastructure services

pub mod capability;
pub mod password_hasher;
pub mod token_generator;

pub use capability::{CapabilityError, CapabilityTokenService, UploadCapability};
pub use password_hasher::PasswordHasher;
pub use token_generator::TokenGenerator;
