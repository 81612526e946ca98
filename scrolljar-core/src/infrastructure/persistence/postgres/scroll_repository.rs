//! SQLx implementation of the scroll repository

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use super::{bounded, statements};
use crate::domain::jar::{IScrollRepository, JarId, Scroll, ScrollId, ScrollUpdate};
use crate::domain::store::{StoreError, Version};

pub struct PgScrollRepository {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PgScrollRepository {
    pub fn new(pool: Arc<PgPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl IScrollRepository for PgScrollRepository {
    #[tracing::instrument(skip(self), fields(scroll_id = %id))]
    async fn find_by_id(&self, id: &ScrollId) -> Result<Option<Scroll>, StoreError> {
        bounded(self.timeout, statements::find_scroll(&*self.pool, id)).await
    }

    #[tracing::instrument(skip(self), fields(jar_id = %jar_id))]
    async fn list_by_jar(&self, jar_id: &JarId) -> Result<Vec<Scroll>, StoreError> {
        bounded(self.timeout, statements::list_scrolls_by_jar(&*self.pool, jar_id)).await
    }

    #[tracing::instrument(skip(self, update), fields(scroll_id = %id, expected = %expected))]
    async fn update_metadata(
        &self,
        id: &ScrollId,
        update: &ScrollUpdate,
        expected: Version,
    ) -> Result<Version, StoreError> {
        bounded(
            self.timeout,
            statements::update_scroll_metadata(&*self.pool, id, update, expected),
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(scroll_id = %id, expected = %expected))]
    async fn mark_delivered(
        &self,
        id: &ScrollId,
        expected: Version,
    ) -> Result<Version, StoreError> {
        bounded(
            self.timeout,
            statements::mark_scroll_delivered(&*self.pool, id, expected),
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(scroll_id = %id))]
    async fn delete(&self, id: &ScrollId) -> Result<(), StoreError> {
        match bounded(self.timeout, statements::delete_scroll(&*self.pool, id)).await? {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn existing_ids(&self, ids: &[ScrollId]) -> Result<Vec<ScrollId>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        bounded(self.timeout, statements::existing_scroll_ids(&*self.pool, ids)).await
    }
}
