//! Read-only integrity checking of the local cache
//!
//! Compares what the catalog expects with what the host reports on disk and
//! what the manifest recorded when each file was written.
//!
//! # Rules
//!
//! - **missing**: no file exists at the derived path
//! - **corrupted**: the file exists but its size disagrees with the recorded
//!   size, its recorded download time is older than `max_age`, it is empty, or
//!   (deep mode) its md5 differs from the recorded checksum
//! - **valid**: anything else, including files that exist without a record
//!
//! Checks never write and take no locks, so categories can be checked
//! concurrently.

pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::client::CatalogClient;
use crate::app::host::{checksum, AssetHost};
use crate::app::layout::{AssetLayout, AssetPart};
use crate::app::manifest::{CategoryManifest, ManifestStore};
use crate::app::models::{AssetVersion, Category};
use crate::constants::cache;
use crate::errors::CatalogResult;

pub use types::{AssetIssue, AssetStatus, CorruptionReason, IntegrityResult};

/// Integrity checking options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityConfig {
    /// Recorded files older than this are treated as corrupted
    pub max_age: Duration,
    /// Also compare content checksums
    pub deep: bool,
    /// Concurrent stat calls per category
    pub concurrency: usize,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            max_age: cache::DEFAULT_MAX_AGE,
            deep: false,
            concurrency: 32,
        }
    }
}

impl IntegrityConfig {
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_age.is_zero() {
            return Err("Maximum asset age cannot be zero".to_string());
        }
        if self.concurrency == 0 {
            return Err("Integrity concurrency must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Per-category results plus their merged totals
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub categories: BTreeMap<Category, IntegrityResult>,
    /// Categories whose catalog could not be fetched
    pub failed_categories: BTreeMap<Category, String>,
    pub totals: IntegrityResult,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.failed_categories.is_empty() && self.totals.is_valid
    }
}

/// Classifies expected files as valid, missing or corrupted
pub struct IntegrityChecker {
    host: Arc<dyn AssetHost>,
    config: IntegrityConfig,
}

impl IntegrityChecker {
    pub fn new(host: Arc<dyn AssetHost>, config: IntegrityConfig) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    /// Classify one expected file
    pub async fn check_asset(&self, part: &AssetPart, manifest: &CategoryManifest) -> AssetStatus {
        let key = part.target_key.as_str();
        let stat = match self.host.file_exists(key).await {
            Ok(stat) => stat,
            Err(e) => {
                debug!("Stat failed for {}: {}; treating as missing", key, e);
                return AssetStatus::Missing;
            }
        };
        if !stat.exists {
            return AssetStatus::Missing;
        }

        let size = match stat.size {
            Some(size) => size,
            None => match self.host.file_size(key).await {
                Ok(size) => size,
                Err(e) => {
                    debug!("Size lookup failed for {}: {}; treating as missing", key, e);
                    return AssetStatus::Missing;
                }
            },
        };
        if size == 0 {
            return AssetStatus::Corrupted(CorruptionReason::Empty);
        }

        let Some(record) = manifest.asset(key) else {
            return AssetStatus::Valid;
        };

        if record.size != size {
            return AssetStatus::Corrupted(CorruptionReason::SizeMismatch {
                expected: record.size,
                actual: size,
            });
        }

        // Future timestamps (clock skew) convert to an error and count as fresh
        if let Ok(age) = (Utc::now() - record.downloaded_at).to_std() {
            if age > self.config.max_age {
                return AssetStatus::Corrupted(CorruptionReason::Stale { age });
            }
        }

        if self.config.deep {
            if let Some(expected) = &record.checksum {
                match self.host.read_asset(key).await {
                    Ok(bytes) => {
                        let actual = checksum(&bytes);
                        if &actual != expected {
                            return AssetStatus::Corrupted(CorruptionReason::ChecksumMismatch {
                                expected: expected.clone(),
                                actual,
                            });
                        }
                    }
                    Err(e) => {
                        debug!("Read failed for {}: {}; treating as missing", key, e);
                        return AssetStatus::Missing;
                    }
                }
            }
        }

        AssetStatus::Valid
    }

    /// Classify a set of expected files against a manifest
    pub async fn check_parts(
        &self,
        parts: Vec<AssetPart>,
        manifest: &CategoryManifest,
    ) -> IntegrityResult {
        let started = Instant::now();
        let statuses: Vec<(AssetPart, AssetStatus)> = stream::iter(parts)
            .map(|part| async move {
                let status = self.check_asset(&part, manifest).await;
                (part, status)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut result = IntegrityResult::new();
        for (part, status) in statuses {
            result.add(part, status);
        }
        result.check_time = started.elapsed();
        result
    }

    /// Check every expected file of one category
    pub async fn check_category(
        &self,
        catalog: &CatalogClient,
        store: &ManifestStore,
        layout: &AssetLayout,
        category: Category,
        version: &AssetVersion,
    ) -> CatalogResult<IntegrityResult> {
        let entries = catalog.entries(category, version).await?;
        let manifest = store.load(category, version).await;
        let parts = entries
            .iter()
            .flat_map(|entry| layout.parts(category, version, entry))
            .collect();
        let result = self.check_parts(parts, &manifest).await;
        info!(
            "{} integrity: {}/{} valid, {} missing, {} corrupted",
            category,
            result.valid_assets,
            result.total_assets,
            result.missing_assets.len(),
            result.corrupted_assets.len()
        );
        Ok(result)
    }

    /// Check all given categories concurrently and merge the results
    ///
    /// A category whose catalog fails is listed in `failed_categories` and
    /// does not affect the others.
    pub async fn check_all_assets(
        &self,
        catalog: &CatalogClient,
        store: &ManifestStore,
        layout: &AssetLayout,
        categories: &[Category],
        version: &AssetVersion,
    ) -> IntegrityReport {
        let results = futures::future::join_all(categories.iter().map(|&category| async move {
            let result = self
                .check_category(catalog, store, layout, category, version)
                .await;
            (category, result)
        }))
        .await;

        let mut report = IntegrityReport {
            totals: IntegrityResult::new(),
            ..Default::default()
        };
        for (category, result) in results {
            match result {
                Ok(result) => {
                    report.totals.merge(result.clone());
                    report.categories.insert(category, result);
                }
                Err(e) => {
                    warn!("Integrity check of {} skipped: {}", category, e);
                    report.failed_categories.insert(category, e.to_string());
                }
            }
        }
        report
    }
}
