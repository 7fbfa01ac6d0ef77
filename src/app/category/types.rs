//! Category synchronization types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::app::models::{AssetVersion, Category};
use crate::app::worker::BatchResult;

/// Stage of a run or of one category within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Idle,
    Counting,
    Checking,
    Downloading,
    Complete,
    Error,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Counting => "counting",
            Stage::Checking => "checking",
            Stage::Downloading => "downloading",
            Stage::Complete => "complete",
            Stage::Error => "error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one category, counted in items
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryProgress {
    pub category: Category,
    pub stage: Stage,
    /// Items confirmed complete, including ones recorded by earlier runs
    pub current: usize,
    pub total: usize,
    pub current_asset: Option<String>,
}

/// Callback receiving category progress
pub type CategoryProgressFn<'a> = &'a (dyn Fn(&CategoryProgress) + Send + Sync);

/// Catalog compared with the manifest, without touching the filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheCompleteness {
    pub category: Category,
    pub version: AssetVersion,
    pub total_expected: usize,
    /// Expected items not recorded as complete
    pub missing: usize,
}

impl CacheCompleteness {
    /// Expected items already recorded
    pub fn completed(&self) -> usize {
        self.total_expected - self.missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing == 0
    }
}

/// Outcome of synchronizing one category
#[derive(Debug, Clone, Serialize)]
pub struct CategorySyncReport {
    pub category: Category,
    pub version: AssetVersion,
    pub total_items: usize,
    /// Items complete before this run, including adopted ones
    pub already_complete: usize,
    /// Items found valid on disk and recorded without downloading
    pub adopted: usize,
    /// Recorded items whose broken files were queued again
    pub repaired_items: usize,
    /// Items completed by this run
    pub completed_items: usize,
    /// Items with at least one failed part
    pub failed_items: usize,
    pub queued_tasks: usize,
    pub batch: BatchResult,
    /// Manifest writes that failed; the items are re-checked next run
    pub manifest_errors: Vec<String>,
}

impl CategorySyncReport {
    /// Items confirmed complete after this run
    pub fn items_done(&self) -> usize {
        self.already_complete + self.completed_items
    }
}
