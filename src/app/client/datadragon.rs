//! Data Dragon catalog source
//!
//! Parses the per-category enumeration documents published on the Data
//! Dragon CDN into [`CatalogEntry`] lists. Overlay images are not part of
//! Data Dragon; their catalog is a fixed list.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::config::ClientConfig;
use super::http::HttpHandler;
use super::types::CatalogEntry;
use super::CatalogSource;
use crate::app::models::{AssetVersion, Category};
use crate::app::worker::retry::{retry_with_backoff, RetryPolicy};
use crate::errors::{CatalogError, CatalogResult, DownloadError};

/// Overlay images as `(group, file)` pairs
pub const OVERLAY_ASSETS: &[(&str, &str)] = &[
    ("dragonpit", "infernal.png"),
    ("dragonpit", "ocean.png"),
    ("dragonpit", "hextech.png"),
    ("dragonpit", "chemtech.png"),
    ("dragonpit", "mountain.png"),
    ("dragonpit", "elder.png"),
    ("dragonpit", "cloud.png"),
    ("default", "player.png"),
    ("scoreboard", "gold.png"),
    ("scoreboard", "grubs.png"),
    ("scoreboard", "tower.png"),
    ("atakhan", "atakhan_ruinous.png"),
    ("atakhan", "atakhan_voracious.png"),
    ("baronpit", "baron.png"),
    ("baronpit", "grubs.png"),
    ("baronpit", "herald.png"),
];

#[derive(Debug, Deserialize)]
struct DataDocument {
    data: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    full: String,
}

#[derive(Debug, Deserialize)]
struct ImagedRecord {
    name: Option<String>,
    image: Option<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ChampionRecord {
    name: Option<String>,
    image: Option<ImageRef>,
    #[serde(default)]
    spells: Vec<ImagedRecord>,
    passive: Option<ImagedRecord>,
}

#[derive(Debug, Deserialize)]
struct RuneTree {
    #[serde(default)]
    slots: Vec<RuneSlot>,
}

#[derive(Debug, Deserialize)]
struct RuneSlot {
    #[serde(default)]
    runes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RuneRecord {
    id: u64,
    name: Option<String>,
    icon: Option<String>,
}

/// Catalog source backed by the Data Dragon CDN
#[derive(Debug, Clone)]
pub struct DataDragonSource {
    http: Arc<HttpHandler>,
    config: ClientConfig,
    policy: RetryPolicy,
}

impl DataDragonSource {
    pub fn new(http: Arc<HttpHandler>, config: ClientConfig) -> Self {
        let policy = RetryPolicy {
            max_attempts: config.catalog_max_attempts,
            ..Default::default()
        };
        Self {
            http,
            config,
            policy,
        }
    }

    /// URL of the enumeration document for a category
    pub fn document_url(&self, category: Category, version: &AssetVersion) -> Option<String> {
        let file = match category {
            Category::Champion => "championFull.json",
            Category::Item => "item.json",
            Category::Spell => "summoner.json",
            Category::Rune => "runesReforged.json",
            Category::Overlay => return None,
        };
        Some(format!(
            "{}/{}/data/{}/{}",
            self.config.cdn_url.trim_end_matches('/'),
            version,
            self.config.locale,
            file
        ))
    }

    async fn fetch_document(&self, category: Category, url: &str) -> CatalogResult<Value> {
        let label = format!("{} catalog", category);
        retry_with_backoff(&self.policy, &label, |_| self.http.get_json::<Value>(url))
            .await
            .map_err(|failure| CatalogError::Fetch {
                category: category.to_string(),
                source: failure.error,
            })
    }
}

#[async_trait]
impl CatalogSource for DataDragonSource {
    async fn latest_version(&self) -> CatalogResult<AssetVersion> {
        let url = self.config.versions_url();
        let versions: Vec<String> =
            tokio::time::timeout(self.config.version_timeout, self.http.get_json(&url))
                .await
                .map_err(|_| CatalogError::Fetch {
                    category: "versions".to_string(),
                    source: DownloadError::Timeout {
                        seconds: self.config.version_timeout.as_secs(),
                    },
                })?
                .map_err(|source| CatalogError::Fetch {
                    category: "versions".to_string(),
                    source,
                })?;

        let latest = versions.into_iter().next().ok_or_else(|| CatalogError::NoVersion {
            reason: "upstream version list is empty".to_string(),
        })?;
        info!("Latest Data Dragon version is {}", latest);
        Ok(AssetVersion::new(latest))
    }

    async fn fetch_entries(
        &self,
        category: Category,
        version: &AssetVersion,
    ) -> CatalogResult<Vec<CatalogEntry>> {
        let Some(url) = self.document_url(category, version) else {
            return Ok(overlay_entries());
        };
        debug!("Fetching {} catalog from {}", category, url);
        let document = self.fetch_document(category, &url).await?;
        let entries = parse_entries(category, document)?;
        info!("{} catalog lists {} items", category, entries.len());
        Ok(entries)
    }
}

/// Fixed overlay catalog
pub fn overlay_entries() -> Vec<CatalogEntry> {
    OVERLAY_ASSETS
        .iter()
        .map(|(group, file)| {
            let key = format!("{}/{}", group, file);
            CatalogEntry::new(key.clone()).with_image(key)
        })
        .collect()
}

/// Parse an upstream enumeration document
pub fn parse_entries(category: Category, document: Value) -> CatalogResult<Vec<CatalogEntry>> {
    match category {
        Category::Champion => parse_champions(document),
        Category::Item | Category::Spell => parse_imaged(category, document),
        Category::Rune => parse_runes(document),
        Category::Overlay => Ok(overlay_entries()),
    }
}

fn parse_data_document(category: Category, document: Value) -> CatalogResult<DataDocument> {
    serde_json::from_value(document).map_err(|e| CatalogError::malformed(category.as_str(), e))
}

fn parse_champions(document: Value) -> CatalogResult<Vec<CatalogEntry>> {
    let category = Category::Champion;
    let doc = parse_data_document(category, document)?;
    doc.data
        .into_iter()
        .map(|(key, value)| {
            let record: ChampionRecord = serde_json::from_value(value)
                .map_err(|e| CatalogError::malformed(category.as_str(), format!("{}: {}", key, e)))?;
            Ok(CatalogEntry {
                name: record.name,
                image: record.image.map(|i| i.full),
                abilities: record
                    .spells
                    .into_iter()
                    .filter_map(|s| s.image.map(|i| i.full))
                    .collect(),
                passive: record.passive.and_then(|p| p.image).map(|i| i.full),
                record: None,
                key,
            })
        })
        .collect()
}

fn parse_imaged(category: Category, document: Value) -> CatalogResult<Vec<CatalogEntry>> {
    let doc = parse_data_document(category, document)?;
    doc.data
        .into_iter()
        .map(|(key, value)| {
            let record: ImagedRecord = serde_json::from_value(value.clone())
                .map_err(|e| CatalogError::malformed(category.as_str(), format!("{}: {}", key, e)))?;
            Ok(CatalogEntry {
                name: record.name,
                image: record.image.map(|i| i.full),
                abilities: Vec::new(),
                passive: None,
                record: Some(value),
                key,
            })
        })
        .collect()
}

fn parse_runes(document: Value) -> CatalogResult<Vec<CatalogEntry>> {
    let category = Category::Rune;
    let trees: Vec<RuneTree> = serde_json::from_value(document)
        .map_err(|e| CatalogError::malformed(category.as_str(), e))?;

    let mut entries = Vec::new();
    for rune in trees
        .into_iter()
        .flat_map(|tree| tree.slots)
        .flat_map(|slot| slot.runes)
    {
        let record: RuneRecord = serde_json::from_value(rune.clone())
            .map_err(|e| CatalogError::malformed(category.as_str(), e))?;
        entries.push(CatalogEntry {
            key: record.id.to_string(),
            name: record.name,
            image: record.icon,
            abilities: Vec::new(),
            passive: None,
            record: Some(rune),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Test champion parsing
    ///
    /// Verifies spell and passive image names are extracted in order.
    #[test]
    fn test_parse_champions() {
        let doc = json!({
            "type": "champion",
            "data": {
                "Ahri": {
                    "id": "Ahri",
                    "name": "Ahri",
                    "image": {"full": "Ahri.png"},
                    "spells": [
                        {"image": {"full": "AhriQ.png"}},
                        {"image": {"full": "AhriW.png"}},
                        {"image": {"full": "AhriE.png"}},
                        {"image": {"full": "AhriR.png"}}
                    ],
                    "passive": {"image": {"full": "Ahri_SoulEater2.png"}}
                }
            }
        });

        let entries = parse_entries(Category::Champion, doc).unwrap();
        assert_eq!(entries.len(), 1);
        let ahri = &entries[0];
        assert_eq!(ahri.key, "Ahri");
        assert_eq!(ahri.abilities, vec!["AhriQ.png", "AhriW.png", "AhriE.png", "AhriR.png"]);
        assert_eq!(ahri.passive.as_deref(), Some("Ahri_SoulEater2.png"));
        assert!(ahri.record.is_none());
    }

    /// Test item and summoner spell parsing
    ///
    /// Verifies the raw record is kept for the inline data file.
    #[test]
    fn test_parse_items_keeps_record() {
        let doc = json!({
            "data": {
                "1001": {"name": "Boots", "image": {"full": "1001.png"}, "gold": {"total": 300}},
                "1004": {"name": "Faerie Charm", "image": {"full": "1004.png"}}
            }
        });

        let entries = parse_entries(Category::Item, doc).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "1001");
        assert_eq!(entries[0].image.as_deref(), Some("1001.png"));
        assert_eq!(entries[0].record.as_ref().unwrap()["gold"]["total"], 300);
    }

    /// Test rune parsing
    ///
    /// Verifies runes are flattened across trees and slots and keyed by id.
    #[test]
    fn test_parse_runes() {
        let doc = json!([
            {
                "id": 8100,
                "key": "Domination",
                "slots": [
                    {"runes": [{"id": 8112, "name": "Electrocute", "icon": "perk-images/Styles/Domination/Electrocute/Electrocute.png"}]},
                    {"runes": [{"id": 8126, "name": "Cheap Shot", "icon": "perk-images/Styles/Domination/CheapShot/CheapShot.png"}]}
                ]
            },
            {
                "id": 8300,
                "slots": [{"runes": [{"id": 8351, "name": "Glacial Augment", "icon": "perk-images/Styles/Inspiration/GlacialAugment/GlacialAugment.png"}]}]
            }
        ]);

        let entries = parse_entries(Category::Rune, doc).unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["8112", "8126", "8351"]);
    }

    #[test]
    fn test_malformed_document_is_reported() {
        let err = parse_entries(Category::Item, json!({"nope": []})).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { .. }));
    }

    #[test]
    fn test_overlay_catalog_is_fixed() {
        let entries = overlay_entries();
        assert_eq!(entries.len(), 16);
        assert!(entries.iter().any(|e| e.key == "baronpit/grubs.png"));
        assert!(entries.iter().any(|e| e.key == "scoreboard/grubs.png"));
    }
}
