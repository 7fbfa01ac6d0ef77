//! Core domain types shared across the pipeline
//!
//! [`Category`] names the asset classes, [`AssetVersion`] pins a catalog
//! release, and [`AssetKind`] drives size estimates for queue ordering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::sizes;

/// Asset category with its own catalog and manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Champion,
    Item,
    Rune,
    Spell,
    Overlay,
}

impl Category {
    /// Every category in processing order
    pub const ALL: [Category; 5] = [
        Category::Champion,
        Category::Item,
        Category::Rune,
        Category::Spell,
        Category::Overlay,
    ];

    /// Stable identifier used in manifests and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Champion => "champion",
            Category::Item => "item",
            Category::Rune => "rune",
            Category::Spell => "spell",
            Category::Overlay => "overlay",
        }
    }

    /// Directory below the version root holding this category's files
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Champion => "champions",
            Category::Item => "items",
            Category::Rune => "runes",
            Category::Spell => "spells",
            Category::Overlay => "overlay",
        }
    }

    /// Queue priority, lower runs first
    pub fn priority(&self) -> u8 {
        match self {
            Category::Champion => 1,
            Category::Item => 2,
            Category::Spell | Category::Rune => 3,
            Category::Overlay => 4,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "champion" | "champions" => Ok(Category::Champion),
            "item" | "items" => Ok(Category::Item),
            "rune" | "runes" => Ok(Category::Rune),
            "spell" | "spells" => Ok(Category::Spell),
            "overlay" | "overlays" => Ok(Category::Overlay),
            other => Err(format!(
                "unknown category '{}', expected one of: champion, item, rune, spell, overlay",
                other
            )),
        }
    }
}

/// Opaque upstream catalog version such as `15.16.1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetVersion(String);

impl AssetVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Kind of a single downloadable part, used for size heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Data,
    Ability,
    Icon,
    Overlay,
    Loading,
    Splash,
}

impl AssetKind {
    /// Rough size in bytes, only meaningful relative to other kinds
    pub fn estimated_size(&self) -> u64 {
        match self {
            AssetKind::Data => sizes::DATA,
            AssetKind::Ability => sizes::ABILITY,
            AssetKind::Icon => sizes::ICON,
            AssetKind::Overlay => sizes::OVERLAY,
            AssetKind::Loading => sizes::LOADING,
            AssetKind::Splash => sizes::SPLASH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test category parsing
    ///
    /// Verifies singular, plural and mixed-case names are accepted and
    /// unknown names rejected with a helpful message.
    #[test]
    fn test_category_from_str() {
        assert_eq!("champion".parse::<Category>().unwrap(), Category::Champion);
        assert_eq!("Items".parse::<Category>().unwrap(), Category::Item);
        assert_eq!(" overlay ".parse::<Category>().unwrap(), Category::Overlay);
        let err = "maps".parse::<Category>().unwrap_err();
        assert!(err.contains("unknown category"));
    }

    /// Test category priorities
    ///
    /// Primary content must sort before auxiliary categories.
    #[test]
    fn test_category_priorities() {
        assert!(Category::Champion.priority() < Category::Item.priority());
        assert!(Category::Item.priority() < Category::Spell.priority());
        assert_eq!(Category::Spell.priority(), Category::Rune.priority());
        assert!(Category::Rune.priority() < Category::Overlay.priority());
    }

    /// Test size ordering of asset kinds
    ///
    /// Data records are smallest, icons medium and splash art largest.
    #[test]
    fn test_asset_kind_size_ordering() {
        assert!(AssetKind::Data.estimated_size() < AssetKind::Icon.estimated_size());
        assert!(AssetKind::Icon.estimated_size() < AssetKind::Splash.estimated_size());
        assert!(AssetKind::Ability.estimated_size() < AssetKind::Icon.estimated_size());
    }

    #[test]
    fn test_asset_version_serde_is_transparent() {
        let version = AssetVersion::new("15.16.1");
        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, "\"15.16.1\"");
        assert_eq!(version.to_string(), "15.16.1");
    }
}
