//! Authentication domain entities

use chrono::{DateTime, Utc};

use super::value_objects::*;
use crate::domain::store::Version;

/// Registered account
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub password_hash: PasswordHash,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
    pub version: Version,
}

/// Account fields supplied at registration
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub password_hash: PasswordHash,
}

/// Persisted bearer token. Only the hash of the plaintext is stored.
#[derive(Debug, Clone)]
pub struct Token {
    pub hash: TokenHash,
    pub user_id: UserId,
    pub scope: TokenScope,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Token returned to the caller once, alongside its stored form
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub plaintext: String,
    pub token: Token,
}

/// Resolved identity of the caller of one request
#[derive(Debug, Clone, Default)]
pub enum Principal {
    #[default]
    Anonymous,
    User(User),
}

impl Principal {
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::User(user) => Some(user),
            Principal::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    /// Identity bound into upload capabilities minted for this caller.
    /// Unactivated accounts are treated as anonymous.
    pub fn capability_id(&self) -> PrincipalId {
        match self {
            Principal::User(user) if user.activated => PrincipalId::from(user.id),
            _ => PrincipalId::ANONYMOUS,
        }
    }
}
