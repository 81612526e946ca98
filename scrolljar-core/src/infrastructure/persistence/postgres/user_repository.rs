//! SQLx implementation of the user repository

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use super::{bounded, statements};
use crate::domain::auth::{Email, IUserRepository, User, UserId};
use crate::domain::store::StoreError;

pub struct PgUserRepository {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PgUserRepository {
    pub fn new(pool: Arc<PgPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl IUserRepository for PgUserRepository {
    #[tracing::instrument(skip(self), fields(email = %email.as_str()))]
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        bounded(
            self.timeout,
            statements::find_user_by_email(&*self.pool, email.as_str()),
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        bounded(self.timeout, statements::find_user_by_id(&*self.pool, user_id)).await
    }
}
