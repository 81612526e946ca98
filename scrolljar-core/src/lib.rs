//! ScrollJar Core - Foundation crate for the ScrollJar paste service
//!
//! # Modules
//!
//! - [`config`]: Strongly-typed configuration with file and environment variable support
//! - [`domain`]: Jars, scrolls, users, tokens, principals and the store contracts
//! - [`application`]: Use cases and the application error surface
//! - [`infrastructure`]: Rate limiting, capability tokens, stores, object storage and mail
//! - [`logging`]: Structured logging with tracing
//!
//! # Architecture
//!
//! ```text
//! scrolljar-core/
//! ├── domain/           # Entities, value objects, repository traits
//! ├── application/      # Use cases (jars, scrolls, users, cleanup)
//! ├── infrastructure/
//! │   ├── rate_limiter/ # Global and per-client token buckets
//! │   ├── auth/         # Capability tokens, password hashing, opaque tokens
//! │   ├── persistence/  # PostgreSQL and in-memory stores
//! │   ├── storage/      # S3 and in-memory object storage
//! │   └── mailer/       # Outbound mail delivery
//! └── config/           # Configuration management
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use scrolljar_core::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `SCROLLJAR__` prefix with double underscore separators:
//!
//! ```bash
//! SCROLLJAR__SERVER__PORT=8008
//! SCROLLJAR__RATE_LIMIT__CLIENT_RATE=10
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
