//! Object storage backends for scroll content

pub mod content;
pub mod memory;
pub mod s3;

pub use content::{body_from_bytes, validate_content};
pub use memory::MemoryObjectStorage;
pub use s3::S3ObjectStorage;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::domain::storage::IObjectStorage;

/// Build the configured object storage backend
pub async fn from_config(config: &StorageConfig, base_url: &str) -> Arc<dyn IObjectStorage> {
    match config.backend {
        StorageBackend::S3 => Arc::new(S3ObjectStorage::from_config(config).await),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object storage; content is lost on restart");
            Arc::new(MemoryObjectStorage::new(format!(
                "{}/objects",
                base_url.trim_end_matches('/')
            )))
        }
    }
}
