//! Authentication repository traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entities::{Token, User};
use super::value_objects::{Email, TokenHash, TokenScope, UserId};
use crate::domain::store::StoreError;

/// User repository trait for single-statement user reads
#[async_trait]
pub trait IUserRepository: Send + Sync {
    /// Find a user by email address
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;

    /// Find a user by user ID
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<User>, StoreError>;
}

/// Token repository trait for persisted bearer tokens
#[async_trait]
pub trait ITokenRepository: Send + Sync {
    /// Store a new token
    async fn insert(&self, token: &Token) -> Result<(), StoreError>;

    /// Resolve the owner of an unexpired token with the given scope
    async fn find_user(
        &self,
        hash: &TokenHash,
        scope: TokenScope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// Remove every token of `scope` held by the user
    async fn delete_for_user(&self, user_id: &UserId, scope: TokenScope) -> Result<u64, StoreError>;
}
