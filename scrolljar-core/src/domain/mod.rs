//! Domain Layer - Core business entities and contracts
//!
//! Entities, value objects and the traits infrastructure implements:
//! repositories, the unit of work, object storage and the mailer.

pub mod auth;
pub mod jar;
pub mod mailer;
pub mod storage;
pub mod store;
pub mod unit_of_work;

#[allow(ambiguous_glob_reexports)]
pub use auth::*;
#[allow(ambiguous_glob_reexports)]
pub use jar::*;
pub use mailer::*;
pub use storage::*;
pub use store::*;
pub use unit_of_work::*;
