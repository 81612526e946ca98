//! Store and storage doubles for failure injection

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use scrolljar_core::domain::auth::{NewUser, Token, TokenHash, TokenScope, User, UserId};
use scrolljar_core::domain::jar::{Jar, JarId, NewJar, NewScroll, ObjectKey, Scroll};
use scrolljar_core::domain::storage::{ByteStream, IObjectStorage, KeyPage, StorageError};
use scrolljar_core::domain::store::{StoreError, Version};
use scrolljar_core::domain::unit_of_work::{IUnitOfWork, IUnitOfWorkFactory};

/// Opens units of work on `inner` whose Nth scroll insert fails.
///
/// Counting is per unit of work, starting at 1.
pub struct FailingUnitOfWorkFactory {
    inner: Arc<dyn IUnitOfWorkFactory>,
    fail_on_scroll: usize,
    rollbacks: Arc<AtomicUsize>,
    commits: Arc<AtomicUsize>,
}

impl FailingUnitOfWorkFactory {
    pub fn new(inner: Arc<dyn IUnitOfWorkFactory>, fail_on_scroll: usize) -> Self {
        Self {
            inner,
            fail_on_scroll,
            rollbacks: Arc::default(),
            commits: Arc::default(),
        }
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IUnitOfWorkFactory for FailingUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn IUnitOfWork>, StoreError> {
        Ok(Box::new(FailingUnitOfWork {
            inner: self.inner.begin().await?,
            fail_on_scroll: self.fail_on_scroll,
            scrolls_inserted: 0,
            rollbacks: self.rollbacks.clone(),
            commits: self.commits.clone(),
        }))
    }
}

struct FailingUnitOfWork {
    inner: Box<dyn IUnitOfWork>,
    fail_on_scroll: usize,
    scrolls_inserted: usize,
    rollbacks: Arc<AtomicUsize>,
    commits: Arc<AtomicUsize>,
}

#[async_trait]
impl IUnitOfWork for FailingUnitOfWork {
    async fn insert_jar(&mut self, jar: &NewJar) -> Result<Jar, StoreError> {
        self.inner.insert_jar(jar).await
    }

    async fn insert_scroll(&mut self, scroll: &NewScroll) -> Result<Scroll, StoreError> {
        self.scrolls_inserted += 1;
        if self.scrolls_inserted == self.fail_on_scroll {
            return Err(StoreError::backend("injected scroll insert failure"));
        }
        self.inner.insert_scroll(scroll).await
    }

    async fn find_jar(&mut self, id: &JarId) -> Result<Option<Jar>, StoreError> {
        self.inner.find_jar(id).await
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<User, StoreError> {
        self.inner.insert_user(user).await
    }

    async fn find_user(&mut self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_token(
        &mut self,
        hash: &TokenHash,
        scope: TokenScope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_token(hash, scope, now).await
    }

    async fn set_user_activated(
        &mut self,
        id: &UserId,
        activated: bool,
        expected: Version,
    ) -> Result<Version, StoreError> {
        self.inner.set_user_activated(id, activated, expected).await
    }

    async fn insert_token(&mut self, token: &Token) -> Result<(), StoreError> {
        self.inner.insert_token(token).await
    }

    async fn delete_tokens_for_user(
        &mut self,
        user_id: &UserId,
        scope: TokenScope,
    ) -> Result<u64, StoreError> {
        self.inner.delete_tokens_for_user(user_id, scope).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.inner.rollback().await
    }
}

/// Object storage whose first write waits for [`HeldStorage::release`]
/// before reaching `inner`. Later writes pass straight through.
pub struct HeldStorage {
    inner: Arc<dyn IObjectStorage>,
    held: AtomicBool,
    entered: Notify,
    released: Notify,
}

impl HeldStorage {
    pub fn new(inner: Arc<dyn IObjectStorage>) -> Self {
        Self {
            inner,
            held: AtomicBool::new(false),
            entered: Notify::new(),
            released: Notify::new(),
        }
    }

    /// Resolves once the first write is parked
    pub async fn wait_until_held(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }
}

#[async_trait]
impl IObjectStorage for HeldStorage {
    async fn put_stream(
        &self,
        key: &ObjectKey,
        content_type: &str,
        body: ByteStream,
    ) -> Result<u64, StorageError> {
        if !self.held.swap(true, Ordering::SeqCst) {
            self.entered.notify_one();
            self.released.notified().await;
        }
        self.inner.put_stream(key, content_type, body).await
    }

    async fn presign_get(&self, key: &ObjectKey, ttl: Duration) -> Result<String, StorageError> {
        self.inner.presign_get(key, ttl).await
    }

    async fn list_keys(&self, continuation: Option<String>) -> Result<KeyPage, StorageError> {
        self.inner.list_keys(continuation).await
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<(), StorageError> {
        self.inner.delete_objects(keys).await
    }
}
