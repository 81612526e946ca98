//! Object storage contract for scroll content

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

use crate::domain::jar::ObjectKey;

/// Streamed request body handed to object storage
pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("content exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("content is not valid UTF-8")]
    InvalidUtf8,

    /// The client body could not be read
    #[error("failed to read request body: {0}")]
    Body(String),

    #[error("object not found: {0}")]
    NotFound(String),

    /// A create-only write found an object already stored under the key
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("object storage error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn backend(message: impl std::fmt::Display) -> Self {
        Self::Backend(message.to_string())
    }

    /// Errors caused by the uploaded content rather than the service
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            StorageError::PayloadTooLarge { .. } | StorageError::InvalidUtf8 | StorageError::Body(_)
        )
    }
}

/// One page of a key listing
#[derive(Debug, Clone, Default)]
pub struct KeyPage {
    pub keys: Vec<String>,
    /// Continuation token for the next page; `None` on the last page
    pub next: Option<String>,
}

#[async_trait]
pub trait IObjectStorage: Send + Sync {
    /// Store the stream under `key`, returning the number of bytes written.
    ///
    /// Writes are create-only: when an object already exists under `key`,
    /// or a concurrent write lands first, the call fails with
    /// [`StorageError::AlreadyExists`] and the stored object is untouched.
    /// Nothing is left behind when the stream fails.
    async fn put_stream(
        &self,
        key: &ObjectKey,
        content_type: &str,
        body: ByteStream,
    ) -> Result<u64, StorageError>;

    /// Time-limited direct download URL
    async fn presign_get(&self, key: &ObjectKey, ttl: Duration) -> Result<String, StorageError>;

    async fn list_keys(&self, continuation: Option<String>) -> Result<KeyPage, StorageError>;

    async fn delete_objects(&self, keys: &[String]) -> Result<(), StorageError>;
}
