//! SQLx implementation of the jar repository

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use super::{bounded, statements};
use crate::domain::auth::UserId;
use crate::domain::jar::{IJarRepository, Jar, JarId};
use crate::domain::store::StoreError;

pub struct PgJarRepository {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PgJarRepository {
    pub fn new(pool: Arc<PgPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl IJarRepository for PgJarRepository {
    #[tracing::instrument(skip(self), fields(jar_id = %id))]
    async fn find_by_id(&self, id: &JarId) -> Result<Option<Jar>, StoreError> {
        bounded(self.timeout, statements::find_jar(&*self.pool, id)).await
    }

    #[tracing::instrument(skip(self), fields(user_id = %owner))]
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Jar>, StoreError> {
        bounded(self.timeout, statements::list_jars_by_owner(&*self.pool, owner)).await
    }

    #[tracing::instrument(skip(self), fields(jar_id = %id))]
    async fn delete(&self, id: &JarId) -> Result<(), StoreError> {
        match bounded(self.timeout, statements::delete_jar(&*self.pool, id)).await? {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }
}
