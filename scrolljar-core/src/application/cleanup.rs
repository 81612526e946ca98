//! Removal of stored content whose scroll no longer exists

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use super::errors::ApplicationError;
use crate::domain::jar::{IScrollRepository, ObjectKey, ScrollId};
use crate::domain::storage::IObjectStorage;

/// Keys checked against the store per round trip
pub const CLEANUP_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Keys listed from object storage
    pub scanned: usize,
    /// Keys not shaped like `{jar}/{scroll}`, left untouched
    pub skipped: usize,
    /// Keys whose scroll is gone
    pub orphaned: usize,
    /// Orphaned keys actually removed
    pub deleted: usize,
}

/// Use case for sweeping orphaned scroll content out of object storage
pub struct OrphanCleanupUseCase {
    scrolls: Arc<dyn IScrollRepository>,
    storage: Arc<dyn IObjectStorage>,
    batch_size: usize,
}

impl OrphanCleanupUseCase {
    pub fn new(scrolls: Arc<dyn IScrollRepository>, storage: Arc<dyn IObjectStorage>) -> Self {
        Self {
            scrolls,
            storage,
            batch_size: CLEANUP_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Walk every key page by page. With `dry_run` nothing is deleted.
    #[instrument(skip(self))]
    pub async fn execute(&self, dry_run: bool) -> Result<CleanupReport, ApplicationError> {
        let mut report = CleanupReport::default();
        let mut batch: Vec<(String, ScrollId)> = Vec::with_capacity(self.batch_size);
        let mut continuation = None;

        loop {
            let page = self.storage.list_keys(continuation.take()).await?;

            for key in page.keys {
                report.scanned += 1;
                match ObjectKey::parse(&key) {
                    Some((_, scroll_id)) => batch.push((key, scroll_id)),
                    None => {
                        tracing::debug!(key = %key, "Skipping foreign object key");
                        report.skipped += 1;
                    }
                }

                if batch.len() >= self.batch_size {
                    self.flush(&mut batch, dry_run, &mut report).await?;
                }
            }

            match page.next {
                Some(next) => continuation = Some(next),
                None => break,
            }
        }

        self.flush(&mut batch, dry_run, &mut report).await?;

        tracing::info!(
            scanned = report.scanned,
            skipped = report.skipped,
            orphaned = report.orphaned,
            deleted = report.deleted,
            dry_run,
            "Orphan cleanup finished"
        );
        Ok(report)
    }

    async fn flush(
        &self,
        batch: &mut Vec<(String, ScrollId)>,
        dry_run: bool,
        report: &mut CleanupReport,
    ) -> Result<(), ApplicationError> {
        if batch.is_empty() {
            return Ok(());
        }

        let ids: Vec<ScrollId> = batch.iter().map(|(_, id)| id.clone()).collect();
        let existing: HashSet<ScrollId> = self.scrolls.existing_ids(&ids).await?.into_iter().collect();

        let orphans: Vec<String> = batch
            .drain(..)
            .filter(|(_, id)| !existing.contains(id))
            .map(|(key, _)| key)
            .collect();
        report.orphaned += orphans.len();

        if orphans.is_empty() || dry_run {
            return Ok(());
        }

        self.storage.delete_objects(&orphans).await?;
        report.deleted += orphans.len();
        tracing::debug!(count = orphans.len(), "Deleted orphaned objects");
        Ok(())
    }
}
