//! Application Layer - Use cases and the application error surface

pub mod cleanup;
pub mod errors;
pub mod jars;
pub mod mail;
pub mod scrolls;
pub mod users;
pub mod validation;

mod unit_of_work;

pub use cleanup::*;
pub use errors::*;
pub use jars::*;
pub use mail::MailDispatcher;
pub use scrolls::*;
pub use users::*;
pub use validation::{FieldError, Validator};
