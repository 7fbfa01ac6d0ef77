//! Integrity report types

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use crate::app::layout::AssetPart;

/// Why an existing file is not trusted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorruptionReason {
    /// Size on disk differs from the recorded size
    SizeMismatch { expected: u64, actual: u64 },
    /// Recorded download is older than the maximum age
    Stale { age: Duration },
    /// Content hash differs from the recorded checksum
    ChecksumMismatch { expected: String, actual: String },
    /// File exists but is empty
    Empty,
}

impl fmt::Display for CorruptionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorruptionReason::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {} bytes, found {}", expected, actual)
            }
            CorruptionReason::Stale { age } => {
                write!(f, "stale: downloaded {} days ago", age.as_secs() / 86_400)
            }
            CorruptionReason::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: expected {}, found {}", expected, actual)
            }
            CorruptionReason::Empty => f.write_str("empty file"),
        }
    }
}

/// Classification of a single expected file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    Valid,
    Missing,
    Corrupted(CorruptionReason),
}

/// A missing or corrupted file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetIssue {
    pub part: AssetPart,
    /// Set for corrupted files
    pub reason: Option<CorruptionReason>,
}

impl AssetIssue {
    pub fn item_key(&self) -> &str {
        &self.part.item_key
    }

    pub fn target_key(&self) -> &str {
        &self.part.target_key
    }
}

/// Outcome of an integrity check
#[derive(Debug, Clone, Default)]
pub struct IntegrityResult {
    pub is_valid: bool,
    pub missing_assets: Vec<AssetIssue>,
    pub corrupted_assets: Vec<AssetIssue>,
    /// Files that passed every check
    pub valid_parts: Vec<AssetPart>,
    pub total_assets: usize,
    pub valid_assets: usize,
    /// Time spent checking
    pub check_time: Duration,
}

impl IntegrityResult {
    /// Create a new empty, valid result
    pub fn new() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    /// Add a valid file to the result
    pub fn add_valid(&mut self, part: AssetPart) {
        self.total_assets += 1;
        self.valid_assets += 1;
        self.valid_parts.push(part);
    }

    /// Add a missing file to the result
    pub fn add_missing(&mut self, part: AssetPart) {
        self.total_assets += 1;
        self.is_valid = false;
        self.missing_assets.push(AssetIssue { part, reason: None });
    }

    /// Add a corrupted file to the result
    pub fn add_corrupted(&mut self, part: AssetPart, reason: CorruptionReason) {
        self.total_assets += 1;
        self.is_valid = false;
        self.corrupted_assets.push(AssetIssue {
            part,
            reason: Some(reason),
        });
    }

    /// Record a classified file
    pub fn add(&mut self, part: AssetPart, status: AssetStatus) {
        match status {
            AssetStatus::Valid => self.add_valid(part),
            AssetStatus::Missing => self.add_missing(part),
            AssetStatus::Corrupted(reason) => self.add_corrupted(part, reason),
        }
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: IntegrityResult) {
        self.is_valid &= other.is_valid;
        self.total_assets += other.total_assets;
        self.valid_assets += other.valid_assets;
        self.missing_assets.extend(other.missing_assets);
        self.corrupted_assets.extend(other.corrupted_assets);
        self.valid_parts.extend(other.valid_parts);
        self.check_time += other.check_time;
    }

    /// Missing and corrupted files
    pub fn problems(&self) -> impl Iterator<Item = &AssetIssue> {
        self.missing_assets.iter().chain(self.corrupted_assets.iter())
    }

    /// Items with at least one missing or corrupted file
    pub fn affected_items(&self) -> BTreeSet<String> {
        self.problems().map(|issue| issue.item_key().to_string()).collect()
    }

    /// Valid share of checked files in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_assets == 0 {
            100.0
        } else {
            (self.valid_assets as f64 / self.total_assets as f64) * 100.0
        }
    }
}
