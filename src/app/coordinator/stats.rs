//! Run statistics and summaries

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::category::{CategorySyncReport, Stage};
use crate::app::models::{AssetVersion, Category};

/// How one category ended
#[derive(Debug, Clone, Serialize)]
pub struct CategoryOutcome {
    pub category: Category,
    pub stage: Stage,
    pub total_items: usize,
    pub completed_items: usize,
    pub failed_items: usize,
    pub downloaded_files: usize,
    pub failed_files: usize,
    /// Structural failure, set when `stage` is `Error`
    pub error: Option<String>,
}

impl CategoryOutcome {
    pub fn from_report(report: &CategorySyncReport) -> Self {
        Self {
            category: report.category,
            stage: Stage::Complete,
            total_items: report.total_items,
            completed_items: report.items_done(),
            failed_items: report.failed_items,
            downloaded_files: report.batch.downloaded,
            failed_files: report.batch.failed,
            error: None,
        }
    }

    pub fn failed(category: Category, error: impl Into<String>) -> Self {
        Self {
            category,
            stage: Stage::Error,
            total_items: 0,
            completed_items: 0,
            failed_items: 0,
            downloaded_files: 0,
            failed_files: 0,
            error: Some(error.into()),
        }
    }

    /// Skipped because the run was cancelled before it started
    pub fn skipped(category: Category, total_items: usize, completed_items: usize) -> Self {
        Self {
            category,
            stage: Stage::Complete,
            total_items,
            completed_items,
            failed_items: 0,
            downloaded_files: 0,
            failed_files: 0,
            error: None,
        }
    }
}

/// Final result of one bootstrap run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub version: AssetVersion,
    /// `Complete` or `Error`
    pub stage: Stage,
    pub categories: Vec<CategoryOutcome>,
    pub downloaded_files: usize,
    pub failed_files: usize,
    pub errors: Vec<String>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Items confirmed complete across all categories
    pub fn completed_items(&self) -> usize {
        self.categories.iter().map(|c| c.completed_items).sum()
    }

    pub fn total_items(&self) -> usize {
        self.categories.iter().map(|c| c.total_items).sum()
    }

    /// Get a summary of the run result
    pub fn summary(&self) -> String {
        let duration = format_duration(self.duration);
        if self.cancelled {
            format!(
                "Run cancelled: {} files downloaded in {}, {}/{} items complete",
                self.downloaded_files,
                duration,
                self.completed_items(),
                self.total_items()
            )
        } else if self.stage == Stage::Error {
            let failed = self
                .categories
                .iter()
                .filter(|c| c.stage == Stage::Error)
                .count();
            format!(
                "Run failed for {} categor{}: {} files downloaded in {}, {} errors",
                failed,
                if failed == 1 { "y" } else { "ies" },
                self.downloaded_files,
                duration,
                self.errors.len()
            )
        } else if self.has_errors() {
            format!(
                "Run completed with errors: {} files downloaded, {} failed in {}",
                self.downloaded_files, self.failed_files, duration
            )
        } else {
            format!(
                "Run completed successfully: {} files downloaded in {}, {}/{} items complete",
                self.downloaded_files,
                duration,
                self.completed_items(),
                self.total_items()
            )
        }
    }
}

/// Format a duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        format!("{}m{}s", total_secs / 60, total_secs % 60)
    } else {
        format!("{}h{}m", total_secs / 3600, (total_secs % 3600) / 60)
    }
}
