//! Transactional scope for multi-row writes
//!
//! A unit of work persists only through [`IUnitOfWork::commit`]. Dropping it,
//! or calling [`IUnitOfWork::rollback`], discards every write made through it.
//! Reads issued through the unit of work observe its own uncommitted writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::auth::{NewUser, Token, TokenHash, TokenScope, User, UserId};
use crate::domain::jar::{Jar, JarId, NewJar, NewScroll, Scroll};
use crate::domain::store::{StoreError, Version};

#[async_trait]
pub trait IUnitOfWork: Send {
    /// Insert a jar under a fresh id, retrying on id collisions
    async fn insert_jar(&mut self, jar: &NewJar) -> Result<Jar, StoreError>;

    /// Insert a scroll under a fresh id, retrying on id collisions
    async fn insert_scroll(&mut self, scroll: &NewScroll) -> Result<Scroll, StoreError>;

    async fn find_jar(&mut self, id: &JarId) -> Result<Option<Jar>, StoreError>;

    /// `Duplicate { constraint: "users_email_key" }` when the email is taken
    async fn insert_user(&mut self, user: &NewUser) -> Result<User, StoreError>;

    async fn find_user(&mut self, id: &UserId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_token(
        &mut self,
        hash: &TokenHash,
        scope: TokenScope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// Conditional activation flag write
    async fn set_user_activated(
        &mut self,
        id: &UserId,
        activated: bool,
        expected: Version,
    ) -> Result<Version, StoreError>;

    async fn insert_token(&mut self, token: &Token) -> Result<(), StoreError>;

    async fn delete_tokens_for_user(
        &mut self,
        user_id: &UserId,
        scope: TokenScope,
    ) -> Result<u64, StoreError>;

    /// Persist every write made through this unit of work
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every write made through this unit of work
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Opens units of work
#[async_trait]
pub trait IUnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn IUnitOfWork>, StoreError>;
}
