//! Store-level errors and the optimistic concurrency version stamp

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Postgres primary key constraints raised on id collisions
pub const JAR_PKEY: &str = "scrolljar_pkey";
pub const SCROLL_PKEY: &str = "scroll_pkey";
/// Unique constraint on `users.email`
pub const USERS_EMAIL_KEY: &str = "users_email_key";

/// Errors returned by repositories and units of work
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// The stored version no longer matches the version the caller observed
    #[error("edit conflict")]
    EditConflict,

    #[error("duplicate value violates constraint {constraint}")]
    Duplicate { constraint: String },

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(message: impl fmt::Display) -> Self {
        Self::Backend(message.to_string())
    }

    pub fn is_duplicate_of(&self, name: &str) -> bool {
        matches!(self, StoreError::Duplicate { constraint } if constraint == name)
    }
}

/// Version stamp of a mutable record: the time of its last successful mutation.
///
/// Stored with microsecond precision. Every mutation moves it strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(DateTime<Utc>);

impl Version {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(6))
    }

    /// Stamp for a freshly inserted record
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self::new(now)
    }

    /// Stamp following this one: `max(now, self + 1µs)`
    pub fn next(self, now: DateTime<Utc>) -> Self {
        let bumped = self.0 + TimeDelta::microseconds(1);
        Self::new(now.trunc_subsecs(6).max(bumped))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Version {
    fn from(at: DateTime<Utc>) -> Self {
        Self::new(at)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
        )
    }
}
