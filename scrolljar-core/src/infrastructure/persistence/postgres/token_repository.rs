//! SQLx implementation of the bearer token repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use super::{bounded, statements};
use crate::domain::auth::{ITokenRepository, Token, TokenHash, TokenScope, User, UserId};
use crate::domain::store::StoreError;

pub struct PgTokenRepository {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PgTokenRepository {
    pub fn new(pool: Arc<PgPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl ITokenRepository for PgTokenRepository {
    #[tracing::instrument(skip(self, token), fields(user_id = %token.user_id, scope = %token.scope))]
    async fn insert(&self, token: &Token) -> Result<(), StoreError> {
        bounded(self.timeout, statements::insert_token(&*self.pool, token)).await
    }

    #[tracing::instrument(skip(self, hash), fields(scope = %scope))]
    async fn find_user(
        &self,
        hash: &TokenHash,
        scope: TokenScope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        bounded(
            self.timeout,
            statements::find_user_by_token(&*self.pool, hash, scope, now),
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id, scope = %scope))]
    async fn delete_for_user(&self, user_id: &UserId, scope: TokenScope) -> Result<u64, StoreError> {
        bounded(
            self.timeout,
            statements::delete_tokens_for_user(&*self.pool, user_id, scope),
        )
        .await
    }
}
