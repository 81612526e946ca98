//! Field-level input validation

use serde::Serialize;

use super::errors::ApplicationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path to the offending field, e.g. `["scrolls", "0", "title"]`
    pub field: Vec<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(key: &str, message: impl Into<String>) -> Self {
        Self {
            field: key.split('.').map(str::to_string).collect(),
            message: message.into(),
        }
    }
}

/// Collects every failed check before reporting
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, key: &str, message: impl Into<String>) {
        if !ok {
            self.errors.push(FieldError::new(key, message));
        }
    }

    pub fn add(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ApplicationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApplicationError::Validation {
                errors: self.errors,
            })
        }
    }
}

/// Account password bounds, in bytes
pub fn check_password(v: &mut Validator, key: &str, password: &str) {
    v.check(
        (8..=72).contains(&password.len()),
        key,
        "must be at least 8 bytes and at most 72 bytes long",
    );
}
