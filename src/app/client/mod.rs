//! Catalog client for the upstream asset enumeration
//!
//! The catalog tells the pipeline which items each category is expected to
//! contain for a given [`AssetVersion`]. Results are kept in an explicit
//! [`CatalogCache`] owned by the client, so repeated reads during one run
//! return the same list without another request.
//!
//! The module is organized into:
//! - `config`: HTTP client and endpoint configuration
//! - `http`: rate-limited HTTP operations shared with the file host
//! - `datadragon`: the Data Dragon implementation of [`CatalogSource`]
//! - `types`: catalog entry types

pub mod config;
pub mod datadragon;
pub mod http;
pub mod types;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::app::models::{AssetVersion, Category};
use crate::constants::ddragon;
use crate::errors::CatalogResult;

pub use config::ClientConfig;
pub use datadragon::DataDragonSource;
pub use http::HttpHandler;
pub use types::CatalogEntry;

/// Upstream enumeration of expected items
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Most recent published version
    async fn latest_version(&self) -> CatalogResult<AssetVersion>;

    /// Expected items of `category` at `version`
    async fn fetch_entries(
        &self,
        category: Category,
        version: &AssetVersion,
    ) -> CatalogResult<Vec<CatalogEntry>>;
}

type EntryCell = Arc<OnceCell<Arc<Vec<CatalogEntry>>>>;

/// Per-run cache of catalog lists
///
/// Concurrent first reads of the same `(category, version)` share one fetch.
/// Failed fetches are not cached.
#[derive(Debug, Default)]
pub struct CatalogCache {
    entries: Mutex<HashMap<(Category, AssetVersion), EntryCell>>,
    version: Mutex<Option<AssetVersion>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, category: Category, version: &AssetVersion) -> EntryCell {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries
            .entry((category, version.clone()))
            .or_default()
            .clone()
    }

    /// Cached list, if one was fetched
    pub fn get(&self, category: Category, version: &AssetVersion) -> Option<Arc<Vec<CatalogEntry>>> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries
            .get(&(category, version.clone()))
            .and_then(|cell| cell.get().cloned())
    }

    /// Resolved version, if one was looked up
    pub fn version(&self) -> Option<AssetVersion> {
        self.version
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn set_version(&self, version: AssetVersion) {
        *self.version.lock().unwrap_or_else(|p| p.into_inner()) = Some(version);
    }

    /// Drop cached lists of one category
    pub fn invalidate(&self, category: Category) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.retain(|(cached, _), _| *cached != category);
        debug!("Invalidated cached {} catalog", category);
    }

    /// Drop every cached list and the resolved version
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
        *self.version.lock().unwrap_or_else(|p| p.into_inner()) = None;
        debug!("Cleared catalog cache");
    }
}

/// Catalog client with version resolution and caching
pub struct CatalogClient {
    source: Arc<dyn CatalogSource>,
    cache: CatalogCache,
    pinned_version: Option<AssetVersion>,
}

impl CatalogClient {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            cache: CatalogCache::new(),
            pinned_version: None,
        }
    }

    /// Always use `version` instead of asking upstream
    pub fn with_pinned_version(mut self, version: Option<AssetVersion>) -> Self {
        self.pinned_version = version;
        self
    }

    /// Resolve the version for this run
    ///
    /// A pinned version wins. Otherwise the latest upstream version is used,
    /// falling back to a known release when the lookup fails.
    pub async fn resolve_version(&self) -> AssetVersion {
        if let Some(version) = &self.pinned_version {
            return version.clone();
        }
        if let Some(version) = self.cache.version() {
            return version;
        }

        let version = match self.source.latest_version().await {
            Ok(version) => version,
            Err(e) => {
                warn!(
                    "Could not resolve latest version ({}), falling back to {}",
                    e,
                    ddragon::FALLBACK_VERSION
                );
                AssetVersion::new(ddragon::FALLBACK_VERSION)
            }
        };
        self.cache.set_version(version.clone());
        version
    }

    /// Expected entries of `category` at `version`
    pub async fn entries(
        &self,
        category: Category,
        version: &AssetVersion,
    ) -> CatalogResult<Arc<Vec<CatalogEntry>>> {
        let cell = self.cache.cell(category, version);
        let entries = cell
            .get_or_try_init(|| async {
                self.source
                    .fetch_entries(category, version)
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(entries.clone())
    }

    /// Expected item keys of `category` at `version`
    pub async fn expected_keys(
        &self,
        category: Category,
        version: &AssetVersion,
    ) -> CatalogResult<Vec<String>> {
        let entries = self.entries(category, version).await?;
        Ok(entries.iter().map(|e| e.key.clone()).collect())
    }

    /// The cache owned by this client
    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }
}
