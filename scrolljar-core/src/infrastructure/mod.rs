//! Infrastructure Layer - Adapters for the domain contracts

pub mod auth;
pub mod mailer;
pub mod persistence;
pub mod rate_limiter;
pub mod storage;

pub use auth::{CapabilityError, CapabilityTokenService, PasswordHasher, TokenGenerator, UploadCapability};
pub use persistence::{MemoryStore, Persistence};
pub use rate_limiter::RateLimiterService;
