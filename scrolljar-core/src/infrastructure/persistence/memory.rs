//! In-memory store for development and tests
//!
//! One mutex guards all tables. Single-statement repository calls take the
//! lock once, so each compare-and-write is atomic. A unit of work stages its
//! writes privately and replays them against a copy of the tables at commit,
//! re-running every uniqueness and version check; the copy replaces the
//! tables only when every staged write applies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::auth::{
    Email, ITokenRepository, IUserRepository, NewUser, Token, TokenHash, TokenScope, User, UserId,
};
use crate::domain::jar::{
    IJarRepository, IScrollRepository, Jar, JarId, NewJar, NewScroll, Scroll, ScrollId,
    ScrollState, ScrollUpdate,
};
use crate::domain::store::{JAR_PKEY, SCROLL_PKEY, StoreError, USERS_EMAIL_KEY, Version};
use crate::domain::unit_of_work::{IUnitOfWork, IUnitOfWorkFactory};

const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Default)]
struct Tables {
    jars: HashMap<JarId, Jar>,
    scrolls: HashMap<ScrollId, Scroll>,
    users: BTreeMap<UserId, User>,
    tokens: HashMap<TokenHash, Token>,
}

/// A write staged by a unit of work
#[derive(Debug, Clone)]
enum StagedWrite {
    InsertJar(Jar),
    InsertScroll(Scroll),
    InsertUser(User),
    SetActivated {
        id: UserId,
        activated: bool,
        expected: Version,
        next: Version,
    },
    InsertToken(Token),
    DeleteTokens {
        user_id: UserId,
        scope: TokenScope,
    },
}

impl Tables {
    fn live_jar(&self, id: &JarId, now: DateTime<Utc>) -> Option<&Jar> {
        self.jars.get(id).filter(|jar| !jar.is_expired(now))
    }

    fn live_scroll(&self, id: &ScrollId, now: DateTime<Utc>) -> Option<&Scroll> {
        self.scrolls
            .get(id)
            .filter(|scroll| self.live_jar(&scroll.jar_id, now).is_some())
    }

    fn user_by_token(&self, hash: &TokenHash, scope: TokenScope, now: DateTime<Utc>) -> Option<&User> {
        self.tokens
            .get(hash)
            .filter(|token| token.scope == scope && !token.is_expired(now))
            .and_then(|token| self.users.get(&token.user_id))
    }

    fn compare_and_write<F>(
        &mut self,
        id: &ScrollId,
        expected: Version,
        now: DateTime<Utc>,
        write: F,
    ) -> Result<Version, StoreError>
    where
        F: FnOnce(&mut Scroll) -> bool,
    {
        let scroll = self.scrolls.get_mut(id).ok_or(StoreError::EditConflict)?;
        if scroll.version != expected || !write(scroll) {
            return Err(StoreError::EditConflict);
        }
        scroll.version = scroll.version.next(now);
        Ok(scroll.version)
    }

    /// Apply one staged write, enforcing the same constraints as the database
    fn apply(&mut self, write: &StagedWrite) -> Result<u64, StoreError> {
        match write {
            StagedWrite::InsertJar(jar) => {
                if self.jars.contains_key(&jar.id) {
                    return Err(duplicate(JAR_PKEY));
                }
                if let Some(owner) = jar.owner
                    && !self.users.contains_key(&owner)
                {
                    return Err(StoreError::backend("jar owner does not exist"));
                }
                self.jars.insert(jar.id.clone(), jar.clone());
                Ok(1)
            }
            StagedWrite::InsertScroll(scroll) => {
                if self.scrolls.contains_key(&scroll.id) {
                    return Err(duplicate(SCROLL_PKEY));
                }
                if !self.jars.contains_key(&scroll.jar_id) {
                    return Err(StoreError::backend("scroll jar does not exist"));
                }
                self.scrolls.insert(scroll.id.clone(), scroll.clone());
                Ok(1)
            }
            StagedWrite::InsertUser(user) => {
                if self.users.values().any(|other| other.email == user.email) {
                    return Err(duplicate(USERS_EMAIL_KEY));
                }
                self.users.insert(user.id, user.clone());
                Ok(1)
            }
            StagedWrite::SetActivated {
                id,
                activated,
                expected,
                next,
            } => {
                let user = self.users.get_mut(id).ok_or(StoreError::EditConflict)?;
                if user.version != *expected {
                    return Err(StoreError::EditConflict);
                }
                user.activated = *activated;
                user.version = *next;
                Ok(1)
            }
            StagedWrite::InsertToken(token) => {
                if !self.users.contains_key(&token.user_id) {
                    return Err(StoreError::backend("token user does not exist"));
                }
                if self.tokens.contains_key(&token.hash) {
                    return Err(duplicate("tokens_pkey"));
                }
                self.tokens.insert(token.hash.clone(), token.clone());
                Ok(1)
            }
            StagedWrite::DeleteTokens { user_id, scope } => {
                let before = self.tokens.len();
                self.tokens
                    .retain(|_, token| !(token.user_id == *user_id && token.scope == *scope));
                Ok((before - self.tokens.len()) as u64)
            }
        }
    }
}

fn duplicate(constraint: &str) -> StoreError {
    StoreError::Duplicate {
        constraint: constraint.to_string(),
    }
}

/// In-memory implementation of every store contract
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    user_ids: Arc<AtomicI64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn jar_count(&self) -> usize {
        self.lock().jars.len()
    }

    pub fn scroll_count(&self) -> usize {
        self.lock().scrolls.len()
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }
}

#[async_trait]
impl IJarRepository for MemoryStore {
    async fn find_by_id(&self, id: &JarId) -> Result<Option<Jar>, StoreError> {
        Ok(self.lock().live_jar(id, Utc::now()).cloned())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Jar>, StoreError> {
        let now = Utc::now();
        let mut jars: Vec<Jar> = self
            .lock()
            .jars
            .values()
            .filter(|jar| jar.is_owned_by(owner) && !jar.is_expired(now))
            .cloned()
            .collect();
        jars.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jars)
    }

    async fn delete(&self, id: &JarId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        tables.jars.remove(id).ok_or(StoreError::NotFound)?;
        tables.scrolls.retain(|_, scroll| scroll.jar_id != *id);
        Ok(())
    }
}

#[async_trait]
impl IScrollRepository for MemoryStore {
    async fn find_by_id(&self, id: &ScrollId) -> Result<Option<Scroll>, StoreError> {
        Ok(self.lock().live_scroll(id, Utc::now()).cloned())
    }

    async fn list_by_jar(&self, jar_id: &JarId) -> Result<Vec<Scroll>, StoreError> {
        let tables = self.lock();
        if tables.live_jar(jar_id, Utc::now()).is_none() {
            return Ok(Vec::new());
        }
        let mut scrolls: Vec<Scroll> = tables
            .scrolls
            .values()
            .filter(|scroll| scroll.jar_id == *jar_id)
            .cloned()
            .collect();
        scrolls.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(scrolls)
    }

    async fn update_metadata(
        &self,
        id: &ScrollId,
        update: &ScrollUpdate,
        expected: Version,
    ) -> Result<Version, StoreError> {
        self.lock().compare_and_write(id, expected, Utc::now(), |scroll| {
            if let Some(title) = &update.title {
                scroll.title = Some(title.clone());
            }
            if let Some(format) = &update.format {
                scroll.format = Some(format.clone());
            }
            true
        })
    }

    async fn mark_delivered(&self, id: &ScrollId, expected: Version) -> Result<Version, StoreError> {
        self.lock().compare_and_write(id, expected, Utc::now(), |scroll| {
            if scroll.state.is_delivered() {
                return false;
            }
            scroll.state = ScrollState::Delivered;
            true
        })
    }

    async fn delete(&self, id: &ScrollId) -> Result<(), StoreError> {
        self.lock()
            .scrolls
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn existing_ids(&self, ids: &[ScrollId]) -> Result<Vec<ScrollId>, StoreError> {
        let tables = self.lock();
        Ok(ids
            .iter()
            .filter(|id| tables.scrolls.contains_key(*id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IUserRepository for MemoryStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|user| user.email == *email)
            .cloned())
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(user_id).cloned())
    }
}

#[async_trait]
impl ITokenRepository for MemoryStore {
    async fn insert(&self, token: &Token) -> Result<(), StoreError> {
        self.lock()
            .apply(&StagedWrite::InsertToken(token.clone()))
            .map(|_| ())
    }

    async fn find_user(
        &self,
        hash: &TokenHash,
        scope: TokenScope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        Ok(self.lock().user_by_token(hash, scope, now).cloned())
    }

    async fn delete_for_user(&self, user_id: &UserId, scope: TokenScope) -> Result<u64, StoreError> {
        self.lock().apply(&StagedWrite::DeleteTokens {
            user_id: *user_id,
            scope,
        })
    }
}

#[async_trait]
impl IUnitOfWorkFactory for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn IUnitOfWork>, StoreError> {
        Ok(Box::new(MemoryUnitOfWork {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }
}

/// Unit of work over a [`MemoryStore`]; dropping it discards the staged writes
pub struct MemoryUnitOfWork {
    store: MemoryStore,
    staged: Vec<StagedWrite>,
}

impl MemoryUnitOfWork {
    /// Committed tables with this unit's staged writes applied on top
    fn view(&self) -> Result<Tables, StoreError> {
        let mut tables = self.store.lock().clone();
        for write in &self.staged {
            tables.apply(write)?;
        }
        Ok(tables)
    }

    fn stage(&mut self, write: StagedWrite) -> Result<u64, StoreError> {
        let affected = self.view()?.apply(&write)?;
        self.staged.push(write);
        Ok(affected)
    }
}

#[async_trait]
impl IUnitOfWork for MemoryUnitOfWork {
    async fn insert_jar(&mut self, jar: &NewJar) -> Result<Jar, StoreError> {
        let now = Utc::now();
        for _ in 0..MAX_ID_ATTEMPTS {
            let record = Jar {
                id: JarId::generate(),
                owner: jar.owner,
                name: jar.name.clone(),
                access: jar.access,
                password_hash: jar.password_hash.clone(),
                tags: jar.tags.clone(),
                expires_at: jar.expires_at,
                created_at: now,
                version: Version::initial(now),
            };
            match self.stage(StagedWrite::InsertJar(record.clone())) {
                Ok(_) => return Ok(record),
                Err(err) if err.is_duplicate_of(JAR_PKEY) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(duplicate(JAR_PKEY))
    }

    async fn insert_scroll(&mut self, scroll: &NewScroll) -> Result<Scroll, StoreError> {
        let now = Utc::now();
        for _ in 0..MAX_ID_ATTEMPTS {
            let record = Scroll {
                id: ScrollId::generate(),
                jar_id: scroll.jar_id.clone(),
                title: scroll.title.clone(),
                format: scroll.format.clone(),
                state: ScrollState::Created,
                created_at: now,
                version: Version::initial(now),
            };
            match self.stage(StagedWrite::InsertScroll(record.clone())) {
                Ok(_) => return Ok(record),
                Err(err) if err.is_duplicate_of(SCROLL_PKEY) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(duplicate(SCROLL_PKEY))
    }

    async fn find_jar(&mut self, id: &JarId) -> Result<Option<Jar>, StoreError> {
        Ok(self.view()?.live_jar(id, Utc::now()).cloned())
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let record = User {
            id: UserId::new(self.store.user_ids.fetch_add(1, Ordering::SeqCst) + 1),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            activated: false,
            created_at: now,
            version: Version::initial(now),
        };
        self.stage(StagedWrite::InsertUser(record.clone()))?;
        Ok(record)
    }

    async fn find_user(&mut self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.view()?.users.get(id).cloned())
    }

    async fn find_user_by_token(
        &mut self,
        hash: &TokenHash,
        scope: TokenScope,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        Ok(self.view()?.user_by_token(hash, scope, now).cloned())
    }

    async fn set_user_activated(
        &mut self,
        id: &UserId,
        activated: bool,
        expected: Version,
    ) -> Result<Version, StoreError> {
        let next = expected.next(Utc::now());
        self.stage(StagedWrite::SetActivated {
            id: *id,
            activated,
            expected,
            next,
        })?;
        Ok(next)
    }

    async fn insert_token(&mut self, token: &Token) -> Result<(), StoreError> {
        self.stage(StagedWrite::InsertToken(token.clone())).map(|_| ())
    }

    async fn delete_tokens_for_user(
        &mut self,
        user_id: &UserId,
        scope: TokenScope,
    ) -> Result<u64, StoreError> {
        self.stage(StagedWrite::DeleteTokens {
            user_id: *user_id,
            scope,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tables = self.store.lock();
        let mut next = tables.clone();
        for write in &self.staged {
            next.apply(write)?;
        }
        *tables = next;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::PasswordHash;
    use crate::domain::jar::JarAccess;
    use chrono::TimeDelta;

    fn new_jar(expires_at: Option<DateTime<Utc>>) -> NewJar {
        NewJar {
            owner: None,
            name: "notes".to_string(),
            access: JarAccess::Public,
            password_hash: None,
            tags: vec![],
            expires_at,
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: "alice".to_string(),
            email: Email::from_trusted(email.to_string()),
            password_hash: PasswordHash::from("hash".to_string()),
        }
    }

    async fn seeded_scroll(store: &MemoryStore) -> Scroll {
        let mut uow = store.begin().await.unwrap();
        let jar = uow.insert_jar(&new_jar(None)).await.unwrap();
        let scroll = uow
            .insert_scroll(&NewScroll {
                jar_id: jar.id,
                title: Some("first".to_string()),
                format: None,
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();
        scroll
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let jar = uow.insert_jar(&new_jar(None)).await.unwrap();

        assert!(uow.find_jar(&jar.id).await.unwrap().is_some());
        assert!(IJarRepository::find_by_id(&store, &jar.id).await.unwrap().is_none());

        drop(uow);
        assert_eq!(store.jar_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let store = MemoryStore::new();
        let scroll = seeded_scroll(&store).await;
        assert_eq!(store.jar_count(), 1);
        assert!(IScrollRepository::find_by_id(&store, &scroll.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemoryStore::new();
        let scroll = seeded_scroll(&store).await;
        let update = ScrollUpdate {
            title: Some("second".to_string()),
            format: None,
        };

        let next = store.update_metadata(&scroll.id, &update, scroll.version).await.unwrap();
        assert!(next > scroll.version);
        assert_eq!(
            store.update_metadata(&scroll.id, &update, scroll.version).await,
            Err(StoreError::EditConflict)
        );
    }

    #[tokio::test]
    async fn test_mark_delivered_only_once() {
        let store = MemoryStore::new();
        let scroll = seeded_scroll(&store).await;

        let delivered = store.mark_delivered(&scroll.id, scroll.version).await.unwrap();
        assert_eq!(
            store.mark_delivered(&scroll.id, delivered).await,
            Err(StoreError::EditConflict)
        );
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&new_user("a@example.com")).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let err = uow.insert_user(&new_user("a@example.com")).await.unwrap_err();
        assert!(err.is_duplicate_of(USERS_EMAIL_KEY));
    }

    #[tokio::test]
    async fn test_commit_rechecks_versions() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let user = uow.insert_user(&new_user("b@example.com")).await.unwrap();
        uow.commit().await.unwrap();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.set_user_activated(&user.id, true, user.version).await.unwrap();
        second.set_user_activated(&user.id, true, user.version).await.unwrap();

        first.commit().await.unwrap();
        assert_eq!(second.commit().await, Err(StoreError::EditConflict));
    }

    #[tokio::test]
    async fn test_expired_jar_is_absent() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let jar = uow
            .insert_jar(&new_jar(Some(Utc::now() - TimeDelta::seconds(1))))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert!(IJarRepository::find_by_id(&store, &jar.id).await.unwrap().is_none());
    }
}
