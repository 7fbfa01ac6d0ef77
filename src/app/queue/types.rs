//! Download task types

use std::fmt;

use crate::app::layout::{AssetPart, TaskSource};
use crate::app::models::{AssetKind, Category};

/// One file to fetch (or generate) and store
///
/// Tasks only live for the duration of one run's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Unique within a run: `{category}:{target_key}`
    pub id: String,
    pub category: Category,
    /// Catalog item this file belongs to
    pub item_key: String,
    pub source: TaskSource,
    pub target_key: String,
    pub kind: AssetKind,
    /// Lower is more urgent
    pub priority: u8,
    /// Heuristic, used only for ordering
    pub estimated_size_bytes: u64,
}

impl DownloadTask {
    /// Build a task for a missing or corrupted part
    pub fn from_part(part: AssetPart) -> Self {
        Self {
            id: format!("{}:{}", part.category, part.target_key),
            category: part.category,
            priority: part.category.priority(),
            estimated_size_bytes: part.kind.estimated_size(),
            item_key: part.item_key,
            source: part.source,
            target_key: part.target_key,
            kind: part.kind,
        }
    }

    /// URL the bytes come from, or `inline`
    pub fn source_url(&self) -> &str {
        self.source.label()
    }
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.target_key, self.source_url())
    }
}
