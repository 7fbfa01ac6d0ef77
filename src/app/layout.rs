//! Mapping from catalog entries to stored files
//!
//! Each catalog item expands into a fixed set of parts: usually a data record
//! plus one or more images. Every part has a versioned target key
//! (`{version}/{category_dir}/{item}/{file}`) and a source, either a remote
//! URL or bytes generated from the catalog entry itself.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::app::client::{CatalogEntry, ClientConfig};
use crate::app::models::{AssetKind, AssetVersion, Category};

/// Label used as the source of generated data files
pub const INLINE_SOURCE: &str = "inline";

/// Where the bytes of a part come from
#[derive(Clone, PartialEq, Eq)]
pub enum TaskSource {
    /// Fetch from this URL
    Remote(String),
    /// Write these bytes
    Inline(Arc<Vec<u8>>),
}

impl TaskSource {
    /// URL or [`INLINE_SOURCE`]
    pub fn label(&self) -> &str {
        match self {
            TaskSource::Remote(url) => url,
            TaskSource::Inline(_) => INLINE_SOURCE,
        }
    }
}

impl fmt::Debug for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskSource::Remote(url) => f.debug_tuple("Remote").field(url).finish(),
            TaskSource::Inline(bytes) => write!(f, "Inline({} bytes)", bytes.len()),
        }
    }
}

/// One file belonging to a catalog item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPart {
    pub category: Category,
    pub item_key: String,
    pub target_key: String,
    pub kind: AssetKind,
    pub source: TaskSource,
}

/// Ability slots in catalog order
const ABILITY_SLOTS: [&str; 4] = ["q", "w", "e", "r"];

/// Builds asset parts for catalog entries
#[derive(Debug, Clone)]
pub struct AssetLayout {
    cdn_url: String,
    locale: String,
    overlay_base_url: String,
}

impl AssetLayout {
    pub fn new(
        cdn_url: impl Into<String>,
        locale: impl Into<String>,
        overlay_base_url: impl Into<String>,
    ) -> Self {
        Self {
            cdn_url: cdn_url.into().trim_end_matches('/').to_string(),
            locale: locale.into(),
            overlay_base_url: overlay_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self::new(&config.cdn_url, &config.locale, &config.overlay_base_url)
    }

    /// Directory holding every file of one item
    pub fn item_dir(&self, category: Category, version: &AssetVersion, key: &str) -> String {
        match category {
            // Overlay keys already carry their group directory and file name
            Category::Overlay => format!("{}/{}", version, category.dir_name()),
            _ => format!("{}/{}/{}", version, category.dir_name(), key),
        }
    }

    /// All parts of `entry`, data record first
    pub fn parts(
        &self,
        category: Category,
        version: &AssetVersion,
        entry: &CatalogEntry,
    ) -> Vec<AssetPart> {
        let dir = self.item_dir(category, version, &entry.key);
        let mut parts = Vec::new();
        let mut push = |file: &str, kind: AssetKind, source: TaskSource| {
            parts.push(AssetPart {
                category,
                item_key: entry.key.clone(),
                target_key: format!("{}/{}", dir, file),
                kind,
                source,
            });
        };

        let cdn = &self.cdn_url;
        let key = &entry.key;
        match category {
            Category::Champion => {
                push(
                    "data.json",
                    AssetKind::Data,
                    TaskSource::Remote(format!(
                        "{}/{}/data/{}/champion/{}.json",
                        cdn, version, self.locale, key
                    )),
                );
                let square = entry
                    .image
                    .clone()
                    .unwrap_or_else(|| format!("{}.png", key));
                push(
                    "square.png",
                    AssetKind::Icon,
                    TaskSource::Remote(format!("{}/{}/img/champion/{}", cdn, version, square)),
                );
                push(
                    "splash.jpg",
                    AssetKind::Splash,
                    TaskSource::Remote(format!("{}/img/champion/splash/{}_0.jpg", cdn, key)),
                );
                push(
                    "splashCentered.jpg",
                    AssetKind::Splash,
                    TaskSource::Remote(format!("{}/img/champion/centered/{}_0.jpg", cdn, key)),
                );
                push(
                    "loading.jpg",
                    AssetKind::Loading,
                    TaskSource::Remote(format!("{}/img/champion/loading/{}_0.jpg", cdn, key)),
                );
                for (slot, image) in ABILITY_SLOTS.iter().zip(&entry.abilities) {
                    push(
                        &format!("abilities/{}.png", slot),
                        AssetKind::Ability,
                        TaskSource::Remote(format!("{}/{}/img/spell/{}", cdn, version, image)),
                    );
                }
                if let Some(passive) = &entry.passive {
                    push(
                        "abilities/passive.png",
                        AssetKind::Ability,
                        TaskSource::Remote(format!("{}/{}/img/passive/{}", cdn, version, passive)),
                    );
                }
            }
            Category::Item | Category::Spell | Category::Rune => {
                if let Some(record) = &entry.record {
                    match serde_json::to_vec_pretty(record) {
                        Ok(bytes) => push(
                            "data.json",
                            AssetKind::Data,
                            TaskSource::Inline(Arc::new(bytes)),
                        ),
                        Err(e) => warn!("Skipping data record of {} {}: {}", category, key, e),
                    }
                }
                if let Some(image) = &entry.image {
                    let url = match category {
                        Category::Item => format!("{}/{}/img/item/{}", cdn, version, image),
                        Category::Spell => format!("{}/{}/img/spell/{}", cdn, version, image),
                        _ => format!("{}/img/{}", cdn, image),
                    };
                    push("icon.png", AssetKind::Icon, TaskSource::Remote(url));
                }
            }
            Category::Overlay => {
                push(
                    key,
                    AssetKind::Overlay,
                    TaskSource::Remote(format!("{}/{}", self.overlay_base_url, key)),
                );
            }
        }

        parts
    }
}

impl Default for AssetLayout {
    fn default() -> Self {
        Self::from_client_config(&ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layout() -> AssetLayout {
        AssetLayout::new("https://cdn.test/cdn/", "en_US", "http://overlay.test/assets")
    }

    /// Test champion expansion
    ///
    /// Verifies the data record, four art variants, abilities and passive.
    #[test]
    fn test_champion_parts() {
        let mut entry = CatalogEntry::new("Ahri").with_image("Ahri.png");
        entry.abilities = vec!["AhriQ.png".into(), "AhriW.png".into(), "AhriE.png".into(), "AhriR.png".into()];
        entry.passive = Some("Ahri_SoulEater2.png".into());

        let parts = layout().parts(Category::Champion, &AssetVersion::new("15.16.1"), &entry);
        let keys: Vec<_> = parts.iter().map(|p| p.target_key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "15.16.1/champions/Ahri/data.json",
                "15.16.1/champions/Ahri/square.png",
                "15.16.1/champions/Ahri/splash.jpg",
                "15.16.1/champions/Ahri/splashCentered.jpg",
                "15.16.1/champions/Ahri/loading.jpg",
                "15.16.1/champions/Ahri/abilities/q.png",
                "15.16.1/champions/Ahri/abilities/w.png",
                "15.16.1/champions/Ahri/abilities/e.png",
                "15.16.1/champions/Ahri/abilities/r.png",
                "15.16.1/champions/Ahri/abilities/passive.png",
            ]
        );
        assert_eq!(
            parts[2].source,
            TaskSource::Remote("https://cdn.test/cdn/img/champion/splash/Ahri_0.jpg".into())
        );
        assert_eq!(parts[5].kind, AssetKind::Ability);
    }

    /// Test inline data records
    ///
    /// Verifies item data comes from the catalog entry itself.
    #[test]
    fn test_item_parts_use_inline_record() {
        let entry = CatalogEntry::new("1001")
            .with_image("1001.png")
            .with_record(json!({"name": "Boots"}));

        let parts = layout().parts(Category::Item, &AssetVersion::new("15.16.1"), &entry);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].target_key, "15.16.1/items/1001/data.json");
        assert_eq!(parts[0].source.label(), INLINE_SOURCE);
        match &parts[0].source {
            TaskSource::Inline(bytes) => {
                let value: serde_json::Value = serde_json::from_slice(bytes).unwrap();
                assert_eq!(value["name"], "Boots");
            }
            other => panic!("expected inline source, got {:?}", other),
        }
        assert_eq!(
            parts[1].source.label(),
            "https://cdn.test/cdn/15.16.1/img/item/1001.png"
        );
    }

    #[test]
    fn test_rune_and_overlay_urls() {
        let rune = CatalogEntry::new("8112")
            .with_image("perk-images/Styles/Domination/Electrocute/Electrocute.png");
        let parts = layout().parts(Category::Rune, &AssetVersion::new("1"), &rune);
        assert_eq!(
            parts[0].source.label(),
            "https://cdn.test/cdn/img/perk-images/Styles/Domination/Electrocute/Electrocute.png"
        );

        let overlay = CatalogEntry::new("dragonpit/elder.png").with_image("dragonpit/elder.png");
        let parts = layout().parts(Category::Overlay, &AssetVersion::new("1"), &overlay);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].target_key, "1/overlay/dragonpit/elder.png");
        assert_eq!(
            parts[0].source.label(),
            "http://overlay.test/assets/dragonpit/elder.png"
        );
    }
}
