//! Jar and scroll repository traits

use async_trait::async_trait;

use super::entities::{Jar, Scroll, ScrollUpdate};
use super::value_objects::{JarId, ScrollId};
use crate::domain::auth::UserId;
use crate::domain::store::{StoreError, Version};

/// Jar repository trait. Expired jars are reported as absent.
#[async_trait]
pub trait IJarRepository: Send + Sync {
    async fn find_by_id(&self, id: &JarId) -> Result<Option<Jar>, StoreError>;

    /// Unexpired jars owned by the user
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Jar>, StoreError>;

    /// Delete a jar and its scrolls. `NotFound` when nothing was removed.
    async fn delete(&self, id: &JarId) -> Result<(), StoreError>;
}

/// Scroll repository trait. Scrolls of expired jars are reported as absent.
#[async_trait]
pub trait IScrollRepository: Send + Sync {
    async fn find_by_id(&self, id: &ScrollId) -> Result<Option<Scroll>, StoreError>;

    async fn list_by_jar(&self, jar_id: &JarId) -> Result<Vec<Scroll>, StoreError>;

    /// Conditional metadata write. Returns the new version, or `EditConflict`
    /// when the stored version differs from `expected`.
    async fn update_metadata(
        &self,
        id: &ScrollId,
        update: &ScrollUpdate,
        expected: Version,
    ) -> Result<Version, StoreError>;

    /// Conditional `Created -> Delivered` transition
    async fn mark_delivered(&self, id: &ScrollId, expected: Version)
    -> Result<Version, StoreError>;

    /// `NotFound` when nothing was removed
    async fn delete(&self, id: &ScrollId) -> Result<(), StoreError>;

    /// Subset of `ids` that still exist, regardless of jar expiry
    async fn existing_ids(&self, ids: &[ScrollId]) -> Result<Vec<ScrollId>, StoreError>;
}
