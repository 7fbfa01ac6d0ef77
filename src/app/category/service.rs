//! Synchronization of one asset category

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::tracker::ItemTracker;
use super::types::{
    CacheCompleteness, CategoryProgress, CategoryProgressFn, CategorySyncReport, Stage,
};
use crate::app::client::{CatalogClient, CatalogEntry};
use crate::app::integrity::{IntegrityChecker, IntegrityResult};
use crate::app::layout::{AssetLayout, AssetPart};
use crate::app::manifest::{CategoryManifest, ItemCompletion, ManifestStore};
use crate::app::models::{AssetVersion, Category};
use crate::app::queue::{parts_per_item, QueueBuilder};
use crate::app::worker::{BatchProgress, BatchResult, WorkerScheduler};
use crate::errors::CatalogResult;

/// Keeps one category of the cache in sync with the catalog
pub struct CategoryCacheService {
    category: Category,
    catalog: Arc<CatalogClient>,
    store: Arc<ManifestStore>,
    checker: Arc<IntegrityChecker>,
    layout: Arc<AssetLayout>,
    scheduler: WorkerScheduler,
}

impl CategoryCacheService {
    pub fn new(
        category: Category,
        catalog: Arc<CatalogClient>,
        store: Arc<ManifestStore>,
        checker: Arc<IntegrityChecker>,
        layout: Arc<AssetLayout>,
        scheduler: WorkerScheduler,
    ) -> Self {
        Self {
            category,
            catalog,
            store,
            checker,
            layout,
            scheduler,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Diff the catalog against the manifest
    pub async fn check_cache_completeness(
        &self,
        version: &AssetVersion,
    ) -> CatalogResult<CacheCompleteness> {
        let entries = self.catalog.entries(self.category, version).await?;
        let manifest = self.store.load(self.category, version).await;
        let completed = recorded_items(&entries, &manifest);

        Ok(CacheCompleteness {
            category: self.category,
            version: version.clone(),
            total_expected: entries.len(),
            missing: entries.len() - completed,
        })
    }

    /// Integrity check of every expected file, without downloading
    pub async fn verify(&self, version: &AssetVersion) -> CatalogResult<IntegrityResult> {
        self.checker
            .check_category(&self.catalog, &self.store, &self.layout, self.category, version)
            .await
    }

    /// Bring the category up to date
    ///
    /// Fails only when the catalog cannot be obtained; every item-level
    /// problem ends up in the report.
    pub async fn sync(
        &self,
        version: &AssetVersion,
        on_progress: CategoryProgressFn<'_>,
    ) -> CatalogResult<CategorySyncReport> {
        let category = self.category;
        let entries = self.catalog.entries(category, version).await?;
        let total = entries.len();
        let manifest = self.store.load(category, version).await;
        let mut done = recorded_items(&entries, &manifest);

        let emit = |stage: Stage, current: usize, current_asset: Option<String>| {
            on_progress(&CategoryProgress {
                category,
                stage,
                current: current.min(total),
                total,
                current_asset,
            })
        };
        emit(Stage::Checking, done, None);

        let parts: Vec<AssetPart> = entries
            .iter()
            .flat_map(|entry| self.layout.parts(category, version, entry))
            .collect();
        let integrity = self.checker.check_parts(parts, &manifest).await;
        debug!(
            "{}: {} of {} files need work",
            category,
            integrity.missing_assets.len() + integrity.corrupted_assets.len(),
            integrity.total_assets
        );

        let repaired_items = integrity
            .affected_items()
            .intersection(&manifest.completed_items)
            .count();
        if repaired_items > 0 {
            info!(
                "{}: repairing missing or corrupted files of {} recorded items",
                category, repaired_items
            );
        }

        let adopted = self
            .adopt_valid_items(version, &entries, &manifest, &integrity)
            .await;
        done += adopted;

        let tasks = QueueBuilder::new().build(&integrity, &manifest.completed_items);
        let queued_tasks = tasks.len();
        let mut report = CategorySyncReport {
            category,
            version: version.clone(),
            total_items: total,
            already_complete: done,
            adopted,
            repaired_items,
            completed_items: 0,
            failed_items: 0,
            queued_tasks,
            batch: BatchResult::empty(),
            manifest_errors: Vec::new(),
        };

        if tasks.is_empty() {
            info!("{} is up to date ({} items)", category, total);
            emit(Stage::Complete, done, None);
            return Ok(report);
        }

        let queued_items = parts_per_item(&tasks);
        let item_count = queued_items.len();
        let pending_items = queued_items
            .into_iter()
            .filter(|(item, _)| !manifest.is_complete(item))
            .collect();
        let tracker = ItemTracker::new(
            category,
            version.clone(),
            total,
            self.store.clone(),
            pending_items,
        );
        info!(
            "{}: downloading {} files for {} items",
            category, queued_tasks, item_count
        );
        emit(Stage::Downloading, done, None);

        let batch = self
            .scheduler
            .run(tasks, &tracker, &|progress: &BatchProgress| {
                emit(
                    Stage::Downloading,
                    done + tracker.completed_items(),
                    progress.current_asset.clone(),
                )
            })
            .await;

        report.completed_items = tracker.completed_items();
        report.failed_items = tracker.failed_items();
        report.manifest_errors = tracker.manifest_errors();
        report.batch = batch;

        info!(
            "{}: {}/{} items complete, {} failed",
            category,
            report.items_done(),
            total,
            report.failed_items
        );
        emit(Stage::Complete, report.items_done(), None);
        Ok(report)
    }

    /// Record items whose files are all valid but which the manifest lacks
    async fn adopt_valid_items(
        &self,
        version: &AssetVersion,
        entries: &[CatalogEntry],
        manifest: &CategoryManifest,
        integrity: &IntegrityResult,
    ) -> usize {
        let affected = integrity.affected_items();
        let adoptable: Vec<ItemCompletion> = entries
            .iter()
            .filter(|entry| !manifest.is_complete(&entry.key) && !affected.contains(&entry.key))
            .map(|entry| ItemCompletion::new(entry.key.clone()))
            .collect();
        if adoptable.is_empty() {
            return 0;
        }

        let count = adoptable.len();
        match self
            .store
            .update_many(self.category, version, adoptable, entries.len())
            .await
        {
            Ok(_) => {
                info!("{}: adopted {} items already on disk", self.category, count);
                count
            }
            Err(e) => {
                warn!("{}: could not adopt items found on disk: {}", self.category, e);
                0
            }
        }
    }
}

/// Expected items recorded as complete
fn recorded_items(entries: &[CatalogEntry], manifest: &CategoryManifest) -> usize {
    let expected: BTreeSet<&str> = entries.iter().map(|e| e.key.as_str()).collect();
    manifest
        .completed_items
        .iter()
        .filter(|key| expected.contains(key.as_str()))
        .count()
}
