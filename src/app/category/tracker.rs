//! Per-item completion tracking
//!
//! Every written file is recorded in the manifest as soon as it succeeds. An
//! item joins `completed_items` only once every queued part of it succeeded.
//! Files of items missing from the tracked set (repairs of items already
//! complete) are recorded but never complete anything.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::app::host::WrittenAsset;
use crate::app::manifest::{AssetRecord, ItemCompletion, ManifestStore};
use crate::app::models::{AssetVersion, Category};
use crate::app::queue::DownloadTask;
use crate::app::worker::{TaskError, TaskObserver};

#[derive(Debug, Default)]
struct ItemState {
    remaining: usize,
    failed: bool,
}

/// Observer that turns successful parts into manifest updates
pub struct ItemTracker {
    category: Category,
    version: AssetVersion,
    total_items: usize,
    store: Arc<ManifestStore>,
    items: Mutex<HashMap<String, ItemState>>,
    completed: AtomicUsize,
    failed: AtomicUsize,
    manifest_errors: Mutex<Vec<String>>,
}

impl ItemTracker {
    pub fn new(
        category: Category,
        version: AssetVersion,
        total_items: usize,
        store: Arc<ManifestStore>,
        parts_per_item: BTreeMap<String, usize>,
    ) -> Self {
        let items = parts_per_item
            .into_iter()
            .map(|(key, remaining)| {
                (
                    key,
                    ItemState {
                        remaining,
                        ..Default::default()
                    },
                )
            })
            .collect();
        Self {
            category,
            version,
            total_items,
            store,
            items: Mutex::new(items),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            manifest_errors: Mutex::new(Vec::new()),
        }
    }

    /// Items recorded in the manifest by this tracker
    pub fn completed_items(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Items with at least one permanently failed part
    pub fn failed_items(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn manifest_errors(&self) -> Vec<String> {
        self.manifest_errors
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn note_manifest_error(&self, what: &str, error: impl std::fmt::Display) {
        warn!("Could not record {} {}: {}", self.category, what, error);
        self.manifest_errors
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(format!("{} {}: {}", self.category, what, error));
    }

    /// Apply one part outcome; true once the part completed its item
    fn settle(&self, task: &DownloadTask, succeeded: bool) -> bool {
        let mut items = self.items.lock().unwrap_or_else(|p| p.into_inner());
        let Some(state) = items.get_mut(&task.item_key) else {
            return false;
        };
        state.remaining = state.remaining.saturating_sub(1);

        if !succeeded && !state.failed {
            state.failed = true;
            self.failed.fetch_add(1, Ordering::SeqCst);
        }

        if state.remaining > 0 || state.failed {
            return false;
        }
        items.remove(&task.item_key);
        true
    }
}

#[async_trait]
impl TaskObserver for ItemTracker {
    async fn on_succeeded(&self, task: &DownloadTask, asset: &WrittenAsset) {
        let record = AssetRecord::new(
            asset.size,
            task.source_url(),
            Some(asset.checksum.clone()),
        );

        if !self.settle(task, true) {
            if let Err(e) = self
                .store
                .record_assets(
                    self.category,
                    &self.version,
                    vec![(task.target_key.clone(), record)],
                )
                .await
            {
                self.note_manifest_error(&task.target_key, e);
            }
            return;
        }

        let completion =
            ItemCompletion::new(task.item_key.clone()).with_asset(task.target_key.clone(), record);
        match self
            .store
            .update(self.category, &self.version, completion, self.total_items)
            .await
        {
            Ok(manifest) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
                debug!(
                    "{} {} complete ({}/{})",
                    self.category, task.item_key, manifest.downloaded_count, manifest.total_items
                );
            }
            Err(e) => self.note_manifest_error(&task.item_key, e),
        }
    }

    async fn on_failed(&self, task: &DownloadTask, _error: &TaskError) {
        self.settle(task, false);
    }
}
