//! In-memory object storage for development and tests

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::jar::ObjectKey;
use crate::domain::storage::{ByteStream, IObjectStorage, KeyPage, StorageError};

#[derive(Clone)]
pub struct MemoryObjectStorage {
    objects: Arc<Mutex<BTreeMap<String, Bytes>>>,
    base_url: String,
    page_size: usize,
}

impl MemoryObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: Arc::default(),
            base_url: base_url.into(),
            page_size: 1000,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Bytes>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, content: impl Into<Bytes>) {
        self.lock().insert(key.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self::new("http://localhost/objects")
    }
}

#[async_trait]
impl IObjectStorage for MemoryObjectStorage {
    async fn put_stream(
        &self,
        key: &ObjectKey,
        _content_type: &str,
        mut body: ByteStream,
    ) -> Result<u64, StorageError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }

        let written = buffer.len() as u64;
        match self.lock().entry(key.as_str().to_string()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(buffer.freeze());
                Ok(written)
            }
        }
    }

    async fn presign_get(&self, key: &ObjectKey, ttl: Duration) -> Result<String, StorageError> {
        if !self.lock().contains_key(key.as_str()) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(format!(
            "{}/{}?expires_in={}",
            self.base_url,
            key,
            ttl.as_secs()
        ))
    }

    async fn list_keys(&self, continuation: Option<String>) -> Result<KeyPage, StorageError> {
        let objects = self.lock();
        let start = match &continuation {
            Some(after) => Bound::Excluded(after.clone()),
            None => Bound::Unbounded,
        };

        let keys: Vec<String> = objects
            .range((start, Bound::Unbounded))
            .take(self.page_size + 1)
            .map(|(key, _)| key.clone())
            .collect();

        if keys.len() > self.page_size {
            let page: Vec<String> = keys[..self.page_size].to_vec();
            let next = page.last().cloned();
            Ok(KeyPage { keys: page, next })
        } else {
            Ok(KeyPage { keys, next: None })
        }
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut objects = self.lock();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }
}
