//! Manifest data structures
//!
//! A [`CategoryManifest`] is the persisted ledger of items confirmed present
//! for one `(category, version)`. Every stored file gets an [`AssetRecord`]
//! through [`CategoryManifest::record_asset`] as soon as it is written; an
//! item joins `completed_items` through [`CategoryManifest::record_item`] once
//! all of its files are stored. Clearing the cache is the only way to shrink
//! it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::models::{AssetVersion, Category};

/// What is known about one stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Size on disk when it was written
    pub size: u64,
    /// When it was written
    pub downloaded_at: DateTime<Utc>,
    /// URL it came from, or `inline` for generated data files
    pub source: String,
    /// Hex md5 of the content
    pub checksum: Option<String>,
}

impl AssetRecord {
    pub fn new(size: u64, source: impl Into<String>, checksum: Option<String>) -> Self {
        Self {
            size,
            downloaded_at: Utc::now(),
            source: source.into(),
            checksum,
        }
    }
}

/// A fully downloaded item and the files backing it
#[derive(Debug, Clone, PartialEq)]
pub struct ItemCompletion {
    pub key: String,
    pub assets: Vec<(String, AssetRecord)>,
}

impl ItemCompletion {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            assets: Vec::new(),
        }
    }

    pub fn with_asset(mut self, target_key: impl Into<String>, record: AssetRecord) -> Self {
        self.assets.push((target_key.into(), record));
        self
    }
}

/// Per-category, per-version ledger of confirmed items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryManifest {
    pub category: Category,
    pub version: AssetVersion,
    pub completed_items: BTreeSet<String>,
    pub downloaded_count: usize,
    pub total_items: usize,
    pub last_downloaded_item: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Records of stored files keyed by target key
    #[serde(default)]
    pub assets: BTreeMap<String, AssetRecord>,
}

impl CategoryManifest {
    /// Manifest with nothing recorded yet
    pub fn empty(category: Category, version: AssetVersion) -> Self {
        Self {
            category,
            version,
            completed_items: BTreeSet::new(),
            downloaded_count: 0,
            total_items: 0,
            last_downloaded_item: None,
            last_updated: None,
            assets: BTreeMap::new(),
        }
    }

    /// Whether the item is recorded as complete
    pub fn is_complete(&self, key: &str) -> bool {
        self.completed_items.contains(key)
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.completed_items.is_empty() && self.assets.is_empty()
    }

    /// Recorded metadata of a stored file
    pub fn asset(&self, target_key: &str) -> Option<&AssetRecord> {
        self.assets.get(target_key)
    }

    /// Remember one stored file, replacing any older record of it
    pub fn record_asset(&mut self, target_key: impl Into<String>, record: AssetRecord) {
        self.assets.insert(target_key.into(), record);
        self.last_updated = Some(Utc::now());
    }

    /// Append one confirmed item and bump the counters
    ///
    /// `total` is the catalog size known by the caller; the stored total never
    /// drops below the number of completed items.
    pub fn record_item(&mut self, completion: ItemCompletion, total: usize) {
        for (target_key, record) in completion.assets {
            self.record_asset(target_key, record);
        }
        self.completed_items.insert(completion.key.clone());
        self.downloaded_count = self.completed_items.len();
        self.total_items = total.max(self.downloaded_count);
        self.last_downloaded_item = Some(completion.key);
        self.last_updated = Some(Utc::now());
    }

    /// Completed share of the catalog in percent
    pub fn completion_percentage(&self) -> f64 {
        if self.total_items == 0 {
            0.0
        } else {
            (self.downloaded_count as f64 / self.total_items as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test append-and-increment semantics
    ///
    /// Verifies counters follow the completed set and the total never falls
    /// below the completed count.
    #[test]
    fn test_record_item_counts() {
        let mut manifest = CategoryManifest::empty(Category::Item, AssetVersion::new("15.16.1"));
        manifest.record_item(
            ItemCompletion::new("1001").with_asset(
                "15.16.1/items/1001/icon.png",
                AssetRecord::new(120, "https://example.com/1001.png", None),
            ),
            3,
        );
        manifest.record_item(ItemCompletion::new("1001"), 3);
        manifest.record_item(ItemCompletion::new("1004"), 1);

        assert_eq!(manifest.downloaded_count, 2);
        assert_eq!(manifest.total_items, 2);
        assert!(manifest.downloaded_count <= manifest.total_items);
        assert_eq!(manifest.last_downloaded_item.as_deref(), Some("1004"));
        assert!(manifest.asset("15.16.1/items/1001/icon.png").is_some());
        assert!(manifest.last_updated.is_some());
    }

    /// Test file records outside item completion
    ///
    /// Verifies a recorded file leaves the completed set alone and a newer
    /// record replaces the older one.
    #[test]
    fn test_record_asset_keeps_items_untouched() {
        let mut manifest = CategoryManifest::empty(Category::Item, AssetVersion::new("15.16.1"));
        let key = "15.16.1/items/1001/data.json";
        manifest.record_asset(key, AssetRecord::new(10, "inline", None));
        manifest.record_asset(key, AssetRecord::new(12, "inline", None));

        assert!(manifest.completed_items.is_empty());
        assert_eq!(manifest.downloaded_count, 0);
        assert_eq!(manifest.asset(key).map(|r| r.size), Some(12));
        assert!(!manifest.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let manifest = CategoryManifest::empty(Category::Rune, AssetVersion::new("15.16.1"));
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["category"], "rune");
        assert_eq!(json["version"], "15.16.1");
        assert!(json.get("completedItems").is_some());
        assert!(json.get("downloadedCount").is_some());
    }

    #[test]
    fn test_completion_percentage() {
        let mut manifest = CategoryManifest::empty(Category::Spell, AssetVersion::new("1"));
        assert_eq!(manifest.completion_percentage(), 0.0);
        manifest.record_item(ItemCompletion::new("SummonerFlash"), 4);
        assert_eq!(manifest.completion_percentage(), 25.0);
    }
}
