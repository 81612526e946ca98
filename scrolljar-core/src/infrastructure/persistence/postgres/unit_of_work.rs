//! Transaction-backed unit of work
//!
//! The unit of work owns one open sqlx transaction. Every write and every
//! mid-sequence read runs on that transaction's connection. Dropping the
//! transaction without committing rolls it back, so release happens on every
//! exit path, including early returns and cancelled request tasks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration;

use super::{bounded, map_sqlx_error, statements};
use crate::domain::auth::{NewUser, Token, TokenHash, TokenScope, User, UserId};
use crate::domain::jar::{Jar, JarId, NewJar, NewScroll, Scroll, ScrollId};
use crate::domain::store::{JAR_PKEY, SCROLL_PKEY, StoreError, Version};
use crate::domain::unit_of_work::{IUnitOfWork, IUnitOfWorkFactory};

/// Fresh ids drawn before an insert gives up on collisions
pub(crate) const MAX_ID_ATTEMPTS: usize = 8;

pub struct PgUnitOfWorkFactory {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PgUnitOfWorkFactory {
    pub fn new(pool: Arc<PgPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl IUnitOfWorkFactory for PgUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn IUnitOfWork>, StoreError> {
        let tx = bounded(self.timeout, async {
            self.pool.begin().await.map_err(map_sqlx_error)
        })
        .await?;

        Ok(Box::new(PgUnitOfWork {
            tx,
            timeout: self.timeout,
        }))
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    timeout: Duration,
}

#[async_trait]
impl IUnitOfWork for PgUnitOfWork {
    #[tracing::instrument(skip(self, jar), fields(owner = ?jar.owner))]
    async fn insert_jar(&mut self, jar: &NewJar) -> Result<Jar, StoreError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = JarId::generate();
            let inserted =
                bounded(self.timeout, statements::insert_jar(&mut *self.tx, &id, jar)).await?;
            match inserted {
                Some(jar) => return Ok(jar),
                None => tracing::debug!(jar_id = %id, "Jar id collision, drawing a new id"),
            }
        }

        Err(StoreError::Duplicate {
            constraint: JAR_PKEY.to_string(),
        })
    }

    #[tracing::instrument(skip(self, scroll), fields(jar_id = %scroll.jar_id))]
    async fn insert_scroll(&mut self, scroll: &NewScroll) -> Result<Scroll, StoreError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = ScrollId::generate();
            let inserted = bounded(
                self.timeout,
                statements::insert_scroll(&mut *self.tx, &id, scroll),
            )
            .await?;
            match inserted {
                Some(scroll) => return Ok(scroll),
                None => tracing::debug!(scroll_id = %id, "Scroll id collision, drawing a new id"),
            }
        }

        Err(StoreError::Duplicate {
            constraint: SCROLL_PKEY.to_string(),
        })
    }

    #[tracing::instrument(skip(self), fields(jar_id = %id))]
    async fn find_jar(&mut self, id: &JarId) -> Result<Option<Jar>, StoreError> {
        bounded(self.timeout, statements::find_jar(&mut *self.tx, id)).await
    }

    #[tracing::instrument(skip(self, user), fields(email = %user.email))]
    async fn insert_user(&mut self, user: &NewUser) -> Result<User, StoreError> {
        bounded(self.timeout, statements::insert_user(&mut *self.tx, user)).await
    }

    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn find_user(&mut self, id: &UserId) -> Result<Option<User>, StoreError> {
        bounded(self.timeout, statements::find_user_by_id(&mut *self.tx, id)).await
    }

    #[tracing::instrument(skip(self, hash), fields(scope = %scope))]
    async fn find_user_by_token(
        &mut self,
        hash: &TokenHash,
        scope: TokenScope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        bounded(
            self.timeout,
            statements::find_user_by_token(&mut *self.tx, hash, scope, now),
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(user_id = %id, expected = %expected))]
    async fn set_user_activated(
        &mut self,
        id: &UserId,
        activated: bool,
        expected: Version,
    ) -> Result<Version, StoreError> {
        bounded(
            self.timeout,
            statements::set_user_activated(&mut *self.tx, id, activated, expected),
        )
        .await
    }

    #[tracing::instrument(skip(self, token), fields(user_id = %token.user_id, scope = %token.scope))]
    async fn insert_token(&mut self, token: &Token) -> Result<(), StoreError> {
        bounded(self.timeout, statements::insert_token(&mut *self.tx, token)).await
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id, scope = %scope))]
    async fn delete_tokens_for_user(
        &mut self,
        user_id: &UserId,
        scope: TokenScope,
    ) -> Result<u64, StoreError> {
        bounded(
            self.timeout,
            statements::delete_tokens_for_user(&mut *self.tx, user_id, scope),
        )
        .await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgUnitOfWork { tx, timeout } = *self;
        bounded(timeout, async { tx.commit().await.map_err(map_sqlx_error) }).await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let PgUnitOfWork { tx, timeout } = *self;
        bounded(timeout, async { tx.rollback().await.map_err(map_sqlx_error) }).await
    }
}
