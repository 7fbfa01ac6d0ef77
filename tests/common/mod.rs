//! Shared fakes for integration tests
//!
//! [`FakeCatalog`] serves scripted catalog lists, [`MemoryHost`] keeps files
//! and manifests in memory and counts every write it performs.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ddragon_cache::app::client::datadragon::overlay_entries;
use ddragon_cache::app::host::{FileStat, WrittenAsset};
use ddragon_cache::app::worker::ConfigPresets;
use ddragon_cache::app::{
    AssetHost, AssetLayout, AssetVersion, BootstrapConfig, Bootstrapper, CatalogEntry,
    CatalogSource, Category, ManifestStorage,
};
use ddragon_cache::errors::{
    CatalogError, CatalogResult, DownloadError, FilesystemError, HostError, HostResult,
};

pub const CDN: &str = "https://cdn.test";

/// Scripted catalog source
pub struct FakeCatalog {
    version: Mutex<String>,
    entries: Mutex<HashMap<Category, Vec<CatalogEntry>>>,
    failing: Mutex<HashSet<Category>>,
    fetches: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(version: &str) -> Self {
        Self {
            version: Mutex::new(version.to_string()),
            entries: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Items with only an icon, one file each
    pub fn with_icons(self, category: Category, keys: &[&str]) -> Self {
        let entries = keys
            .iter()
            .map(|key| CatalogEntry::new(*key).with_image(format!("{}.png", key)))
            .collect();
        self.entries.lock().unwrap().insert(category, entries);
        self
    }

    pub fn with_entries(self, category: Category, entries: Vec<CatalogEntry>) -> Self {
        self.entries.lock().unwrap().insert(category, entries);
        self
    }

    pub fn with_overlay(self) -> Self {
        self.with_entries(Category::Overlay, overlay_entries())
    }

    pub fn set_version(&self, version: &str) {
        *self.version.lock().unwrap() = version.to_string();
    }

    pub fn fail(&self, category: Category) {
        self.failing.lock().unwrap().insert(category);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn latest_version(&self) -> CatalogResult<AssetVersion> {
        Ok(AssetVersion::new(self.version.lock().unwrap().clone()))
    }

    async fn fetch_entries(
        &self,
        category: Category,
        _version: &AssetVersion,
    ) -> CatalogResult<Vec<CatalogEntry>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&category) {
            return Err(CatalogError::Fetch {
                category: category.to_string(),
                source: DownloadError::ServerError { status: 502 },
            });
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&category)
            .cloned()
            .unwrap_or_default())
    }
}

/// In-memory host counting writes and concurrent transfers
#[derive(Default)]
pub struct MemoryHost {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    manifests: Mutex<BTreeMap<(Category, String), Vec<u8>>>,
    writes: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Mutex<Duration>,
    clear_delay: Mutex<Duration>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        let host = Self::default();
        *host.delay.lock().unwrap() = delay;
        host
    }

    /// Slow down manifest removal so a clear stays in progress for a while
    pub fn set_clear_delay(&self, delay: Duration) {
        *self.clear_delay.lock().unwrap() = delay;
    }

    /// Every write of `key` fails with a permanent error
    pub fn fail_key(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn put_file(&self, key: &str, content: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), content.to_vec());
    }

    pub fn delete_file(&self, key: &str) {
        self.files.lock().unwrap().remove(key);
    }

    pub fn file(&self, key: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(key).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn put_manifest(&self, category: Category, version: &str, blob: &[u8]) {
        self.manifests
            .lock()
            .unwrap()
            .insert((category, version.to_string()), blob.to_vec());
    }

    /// Keys written so far, in completion order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn store(&self, key: &str, content: Vec<u8>) -> HostResult<WrittenAsset> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(key) {
            return Err(HostError::Network(DownloadError::NotFound {
                url: key.to_string(),
            }));
        }

        let written = WrittenAsset {
            local_path: PathBuf::from(key),
            size: content.len() as u64,
            checksum: format!("{:x}", md5::compute(&content)),
        };
        self.files.lock().unwrap().insert(key.to_string(), content);
        self.writes.lock().unwrap().push(key.to_string());
        Ok(written)
    }
}

#[async_trait]
impl AssetHost for MemoryHost {
    async fn file_exists(&self, key: &str) -> HostResult<FileStat> {
        Ok(match self.files.lock().unwrap().get(key) {
            Some(content) => FileStat::present(content.len() as u64),
            None => FileStat::missing(),
        })
    }

    async fn file_size(&self, key: &str) -> HostResult<u64> {
        self.files
            .lock()
            .unwrap()
            .get(key)
            .map(|content| content.len() as u64)
            .ok_or_else(|| {
                HostError::Filesystem(FilesystemError::InvalidKey {
                    key: key.to_string(),
                })
            })
    }

    async fn read_asset(&self, key: &str) -> HostResult<Vec<u8>> {
        self.file(key).ok_or_else(|| {
            HostError::Filesystem(FilesystemError::InvalidKey {
                key: key.to_string(),
            })
        })
    }

    async fn write_asset(
        &self,
        url: &str,
        _category: Category,
        key: &str,
    ) -> HostResult<WrittenAsset> {
        self.store(key, format!("fetched from {}", url).into_bytes())
            .await
    }

    async fn write_bytes(
        &self,
        _category: Category,
        key: &str,
        bytes: &[u8],
    ) -> HostResult<WrittenAsset> {
        self.store(key, bytes.to_vec()).await
    }

    async fn remove_assets(&self, category: Option<Category>) -> HostResult<usize> {
        let mut files = self.files.lock().unwrap();
        let before = files.len();
        files.retain(|key, _| match category {
            Some(category) => key.split('/').nth(1) != Some(category.dir_name()),
            None => false,
        });
        Ok(before - files.len())
    }
}

#[async_trait]
impl ManifestStorage for MemoryHost {
    async fn load_manifest(
        &self,
        category: Category,
        version: &AssetVersion,
    ) -> HostResult<Option<Vec<u8>>> {
        Ok(self
            .manifests
            .lock()
            .unwrap()
            .get(&(category, version.to_string()))
            .cloned())
    }

    async fn save_manifest(
        &self,
        category: Category,
        version: &AssetVersion,
        blob: &[u8],
    ) -> HostResult<()> {
        self.put_manifest(category, version.as_str(), blob);
        Ok(())
    }

    async fn remove_manifests(&self, category: Option<Category>) -> HostResult<usize> {
        let delay = *self.clear_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        let mut manifests = self.manifests.lock().unwrap();
        let before = manifests.len();
        manifests.retain(|(stored, _), _| category.map_or(false, |c| c != *stored));
        Ok(before - manifests.len())
    }
}

pub fn layout() -> AssetLayout {
    AssetLayout::new(CDN, "en_US", "https://overlay.test")
}

/// Target key of a single-icon item
pub fn icon_key(version: &str, category: Category, item: &str) -> String {
    format!("{}/{}/{}/icon.png", version, category.dir_name(), item)
}

/// Fast configuration with a concurrency cap of `cap`
pub fn test_config(categories: Vec<Category>, cap: usize) -> BootstrapConfig {
    let mut scheduler = ConfigPresets::testing();
    scheduler.max_concurrency = cap;
    BootstrapConfig::default()
        .with_categories(categories)
        .with_progress_interval(Duration::ZERO)
        .with_scheduler(scheduler)
}

pub fn bootstrapper(
    catalog: Arc<FakeCatalog>,
    host: Arc<MemoryHost>,
    config: BootstrapConfig,
) -> Bootstrapper {
    let catalog = Arc::new(ddragon_cache::app::CatalogClient::new(catalog));
    Bootstrapper::new(config, catalog, host.clone(), host, layout()).unwrap()
}
