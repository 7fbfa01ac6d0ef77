//! Catalog entry types

use serde::{Deserialize, Serialize};

/// One expected item of a category as enumerated by the upstream catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Item key, unique within the category
    pub key: String,
    /// Display name, when upstream provides one
    pub name: Option<String>,
    /// Primary image reference (file name or path, category specific)
    pub image: Option<String>,
    /// Champion ability image names in Q, W, E, R order
    #[serde(default)]
    pub abilities: Vec<String>,
    /// Champion passive image name
    pub passive: Option<String>,
    /// Raw upstream record stored as the item's data file
    pub record: Option<serde_json::Value>,
}

impl CatalogEntry {
    /// Entry with only a key
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: None,
            image: None,
            abilities: Vec::new(),
            passive: None,
            record: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_record(mut self, record: serde_json::Value) -> Self {
        self.record = Some(record);
        self
    }
}
