//! Serialized manifest persistence
//!
//! All writes for one `(category, version)` pass through a single async mutex,
//! so concurrent workers finishing items of the same category never lose each
//! other's entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::types::{AssetRecord, CategoryManifest, ItemCompletion};
use crate::app::host::ManifestStorage;
use crate::app::models::{AssetVersion, Category};
use crate::errors::{HostResult, ManifestError, ManifestResult};

type LockMap = HashMap<(Category, AssetVersion), Arc<tokio::sync::Mutex<()>>>;

/// Loads and updates category manifests through a [`ManifestStorage`]
pub struct ManifestStore {
    storage: Arc<dyn ManifestStorage>,
    locks: Mutex<LockMap>,
}

impl ManifestStore {
    pub fn new(storage: Arc<dyn ManifestStorage>) -> Self {
        Self {
            storage,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, category: Category, version: &AssetVersion) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks
            .entry((category, version.clone()))
            .or_default()
            .clone()
    }

    /// Decode a stored blob, rejecting blobs for another category or version
    fn decode(
        category: Category,
        version: &AssetVersion,
        blob: &[u8],
    ) -> ManifestResult<CategoryManifest> {
        let name = format!("{}/{}", version, category);
        let manifest: CategoryManifest =
            serde_json::from_slice(blob).map_err(|e| ManifestError::Corruption {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        if manifest.category != category || &manifest.version != version {
            return Err(ManifestError::Corruption {
                name,
                reason: format!(
                    "blob belongs to {}/{}",
                    manifest.version, manifest.category
                ),
            });
        }
        Ok(manifest)
    }

    /// Read the current manifest; storage failures are returned, corruption
    /// becomes an empty manifest
    async fn read(
        &self,
        category: Category,
        version: &AssetVersion,
    ) -> ManifestResult<CategoryManifest> {
        let blob = self.storage.load_manifest(category, version).await?;
        let Some(blob) = blob else {
            return Ok(CategoryManifest::empty(category, version.clone()));
        };

        match Self::decode(category, version, &blob) {
            Ok(mut manifest) => {
                // Counters are derived from the set; repair hand-edited files
                manifest.downloaded_count = manifest.completed_items.len();
                manifest.total_items = manifest.total_items.max(manifest.downloaded_count);
                Ok(manifest)
            }
            Err(e) => {
                warn!("{}; treating as empty", e);
                Ok(CategoryManifest::empty(category, version.clone()))
            }
        }
    }

    /// Load the manifest for `(category, version)`
    ///
    /// Missing, unreadable and corrupted manifests all load as empty, which
    /// triggers a full integrity re-check.
    pub async fn load(&self, category: Category, version: &AssetVersion) -> CategoryManifest {
        match self.read(category, version).await {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Could not load {} manifest for {}: {}", category, version, e);
                CategoryManifest::empty(category, version.clone())
            }
        }
    }

    /// Append one confirmed item and persist immediately
    pub async fn update(
        &self,
        category: Category,
        version: &AssetVersion,
        completion: ItemCompletion,
        total: usize,
    ) -> ManifestResult<CategoryManifest> {
        self.update_many(category, version, vec![completion], total)
            .await
    }

    /// Append several confirmed items in one serialized read-modify-write
    pub async fn update_many(
        &self,
        category: Category,
        version: &AssetVersion,
        completions: Vec<ItemCompletion>,
        total: usize,
    ) -> ManifestResult<CategoryManifest> {
        let manifest = self
            .modify(category, version, |manifest| {
                for completion in completions {
                    manifest.record_item(completion, total);
                }
            })
            .await?;
        debug!(
            "{} manifest for {} now has {}/{} items",
            category, version, manifest.downloaded_count, manifest.total_items
        );
        Ok(manifest)
    }

    /// Record stored files without touching `completed_items`
    pub async fn record_assets(
        &self,
        category: Category,
        version: &AssetVersion,
        assets: Vec<(String, AssetRecord)>,
    ) -> ManifestResult<CategoryManifest> {
        self.modify(category, version, |manifest| {
            for (target_key, record) in assets {
                manifest.record_asset(target_key, record);
            }
        })
        .await
    }

    /// Serialized read-modify-write of one manifest
    ///
    /// A storage failure while reading aborts the change instead of writing a
    /// manifest that could drop entries.
    async fn modify<F>(
        &self,
        category: Category,
        version: &AssetVersion,
        apply: F,
    ) -> ManifestResult<CategoryManifest>
    where
        F: FnOnce(&mut CategoryManifest),
    {
        let lock = self.lock_for(category, version);
        let _guard = lock.lock().await;

        let mut manifest = self.read(category, version).await?;
        apply(&mut manifest);

        let blob = serde_json::to_vec_pretty(&manifest)?;
        self.storage.save_manifest(category, version, &blob).await?;
        Ok(manifest)
    }

    /// Remove persisted manifests of one category (every version) or all
    pub async fn clear(&self, category: Option<Category>) -> HostResult<usize> {
        self.storage.remove_manifests(category).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FilesystemError, HostError};
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStorage {
        blobs: Mutex<HashMap<(Category, AssetVersion), Vec<u8>>>,
        fail_reads: bool,
    }

    #[async_trait]
    impl ManifestStorage for MemoryStorage {
        async fn load_manifest(
            &self,
            category: Category,
            version: &AssetVersion,
        ) -> HostResult<Option<Vec<u8>>> {
            if self.fail_reads {
                return Err(HostError::Filesystem(FilesystemError::io(
                    "manifest",
                    std::io::Error::new(std::io::ErrorKind::Other, "locked"),
                )));
            }
            // Yield so concurrent updates interleave
            tokio::task::yield_now().await;
            Ok(self
                .blobs
                .lock()
                .unwrap()
                .get(&(category, version.clone()))
                .cloned())
        }

        async fn save_manifest(
            &self,
            category: Category,
            version: &AssetVersion,
            blob: &[u8],
        ) -> HostResult<()> {
            tokio::task::yield_now().await;
            self.blobs
                .lock()
                .unwrap()
                .insert((category, version.clone()), blob.to_vec());
            Ok(())
        }

        async fn remove_manifests(&self, category: Option<Category>) -> HostResult<usize> {
            let mut blobs = self.blobs.lock().unwrap();
            let before = blobs.len();
            blobs.retain(|(c, _), _| category.map_or(false, |only| *c != only));
            Ok(before - blobs.len())
        }
    }

    fn v(s: &str) -> AssetVersion {
        AssetVersion::new(s)
    }

    /// Test lost-update protection
    ///
    /// Verifies that many concurrent single-item updates all survive.
    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_entries() {
        let store = Arc::new(ManifestStore::new(Arc::new(MemoryStorage::default())));
        let version = v("15.16.1");

        let mut handles = Vec::new();
        for i in 0..40 {
            let store = store.clone();
            let version = version.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        Category::Champion,
                        &version,
                        ItemCompletion::new(format!("champ{}", i)),
                        40,
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let manifest = store.load(Category::Champion, &version).await;
        assert_eq!(manifest.completed_items.len(), 40);
        assert_eq!(manifest.downloaded_count, 40);
        assert_eq!(manifest.total_items, 40);
    }

    /// Test file records racing item completions
    ///
    /// Verifies per-file records and completed items written concurrently
    /// all land in the same manifest.
    #[tokio::test]
    async fn test_asset_records_and_items_interleave() {
        let store = Arc::new(ManifestStore::new(Arc::new(MemoryStorage::default())));
        let version = v("15.16.1");

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let version = version.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("15.16.1/items/{}/icon.png", i);
                store
                    .record_assets(
                        Category::Item,
                        &version,
                        vec![(key, AssetRecord::new(i, "https://cdn.test", None))],
                    )
                    .await
                    .unwrap();
                if i % 2 == 0 {
                    store
                        .update(Category::Item, &version, ItemCompletion::new(i.to_string()), 20)
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let manifest = store.load(Category::Item, &version).await;
        assert_eq!(manifest.assets.len(), 20);
        assert_eq!(manifest.completed_items.len(), 10);
        assert_eq!(
            manifest.asset("15.16.1/items/7/icon.png").map(|r| r.size),
            Some(7)
        );
    }

    /// Test corruption handling
    ///
    /// Verifies an unparsable blob loads as empty and is replaced by the next
    /// update.
    #[tokio::test]
    async fn test_corrupted_manifest_is_treated_as_empty() {
        let storage = Arc::new(MemoryStorage::default());
        storage
            .blobs
            .lock()
            .unwrap()
            .insert((Category::Item, v("15.16.1")), b"{not json".to_vec());
        let store = ManifestStore::new(storage);

        let manifest = store.load(Category::Item, &v("15.16.1")).await;
        assert!(manifest.is_empty());

        let updated = store
            .update(Category::Item, &v("15.16.1"), ItemCompletion::new("1001"), 2)
            .await
            .unwrap();
        assert_eq!(updated.downloaded_count, 1);
    }

    /// Test version isolation
    ///
    /// Verifies that a manifest for one version is never read for another.
    #[tokio::test]
    async fn test_manifest_is_version_scoped() {
        let storage = Arc::new(MemoryStorage::default());
        let store = ManifestStore::new(storage.clone());
        store
            .update(Category::Item, &v("15.15.1"), ItemCompletion::new("1001"), 1)
            .await
            .unwrap();

        let fresh = store.load(Category::Item, &v("15.16.1")).await;
        assert_eq!(fresh.downloaded_count, 0);

        // A blob stored under the new version but written for the old one
        let stale = storage
            .blobs
            .lock()
            .unwrap()
            .get(&(Category::Item, v("15.15.1")))
            .cloned()
            .unwrap();
        storage
            .blobs
            .lock()
            .unwrap()
            .insert((Category::Item, v("15.16.1")), stale);
        assert!(store.load(Category::Item, &v("15.16.1")).await.is_empty());
    }

    /// Test that read failures abort updates
    #[tokio::test]
    async fn test_update_fails_when_storage_unreadable() {
        let store = ManifestStore::new(Arc::new(MemoryStorage {
            fail_reads: true,
            ..Default::default()
        }));
        let result = store
            .update(Category::Rune, &v("1"), ItemCompletion::new("8112"), 1)
            .await;
        assert!(matches!(result, Err(ManifestError::Storage(_))));
        assert!(store.load(Category::Rune, &v("1")).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_many_and_clear() {
        let store = ManifestStore::new(Arc::new(MemoryStorage::default()));
        let record = AssetRecord::new(10, "inline", None);
        let manifest = store
            .update_many(
                Category::Spell,
                &v("1"),
                vec![
                    ItemCompletion::new("SummonerFlash")
                        .with_asset("1/spells/SummonerFlash/data.json", record.clone()),
                    ItemCompletion::new("SummonerHeal"),
                ],
                5,
            )
            .await
            .unwrap();
        assert_eq!(manifest.downloaded_count, 2);
        assert_eq!(manifest.total_items, 5);

        assert_eq!(store.clear(Some(Category::Spell)).await.unwrap(), 1);
        assert!(store.load(Category::Spell, &v("1")).await.is_empty());
    }
}
