//! Download queue construction
//!
//! [`QueueBuilder`] is a pure transform from an [`IntegrityResult`] to an
//! ordered list of [`DownloadTask`]s. It performs no I/O.
//!
//! # Ordering
//!
//! 1. Category priority, lower first (champions before overlays)
//! 2. Estimated size, larger first within a priority tier
//! 3. Target key, so equal inputs always produce the same queue
//!
//! # Item granularity
//!
//! An item that is not recorded as complete and has any missing or corrupted
//! file is queued whole: its valid files are fetched again too, so the item is
//! retried as a unit and every file gets a fresh record. Items already
//! recorded as complete only get their broken files repaired.

pub mod types;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use crate::app::integrity::IntegrityResult;
use crate::app::layout::AssetPart;

pub use types::DownloadTask;

/// Turns integrity problems into download tasks
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueBuilder;

impl QueueBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the ordered task list
    ///
    /// Every missing or corrupted file becomes a task. Valid files become
    /// tasks too when their item is incomplete and has a problem elsewhere.
    pub fn build(
        &self,
        integrity: &IntegrityResult,
        completed_items: &BTreeSet<String>,
    ) -> Vec<DownloadTask> {
        let retried_whole: BTreeSet<String> = integrity
            .affected_items()
            .into_iter()
            .filter(|item| !completed_items.contains(item))
            .collect();
        let refetched = integrity
            .valid_parts
            .iter()
            .filter(|part| retried_whole.contains(&part.item_key));

        let mut seen = HashSet::new();
        let mut repairs = 0usize;
        let mut tasks: Vec<DownloadTask> = integrity
            .problems()
            .map(|issue| &issue.part)
            .inspect(|part| {
                if completed_items.contains(&part.item_key) {
                    repairs += 1;
                }
            })
            .chain(refetched)
            .filter(|part| seen.insert(part.target_key.clone()))
            .map(|part: &AssetPart| DownloadTask::from_part(part.clone()))
            .collect();

        tasks.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.estimated_size_bytes.cmp(&a.estimated_size_bytes))
                .then_with(|| a.target_key.cmp(&b.target_key))
        });

        if repairs > 0 {
            debug!(
                "Repairing {} broken files of items already recorded as complete",
                repairs
            );
        }
        tasks
    }
}

/// Number of queued parts per item
pub fn parts_per_item(tasks: &[DownloadTask]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for task in tasks {
        *counts.entry(task.item_key.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::integrity::CorruptionReason;
    use crate::app::layout::{AssetPart, TaskSource};
    use crate::app::models::{AssetKind, Category};

    fn part(category: Category, item: &str, file: &str, kind: AssetKind) -> AssetPart {
        AssetPart {
            category,
            item_key: item.to_string(),
            target_key: format!("1/{}/{}/{}", category.dir_name(), item, file),
            kind,
            source: TaskSource::Remote(format!("https://cdn.test/{}/{}", item, file)),
        }
    }

    /// Test scenario with one recorded item
    ///
    /// Verifies a recorded valid item yields nothing while a missing and a
    /// corrupted item are both queued.
    #[test]
    fn test_build_queues_missing_and_corrupted() {
        let mut integrity = IntegrityResult::new();
        integrity.add_valid(part(Category::Item, "A", "icon.png", AssetKind::Icon));
        integrity.add_missing(part(Category::Item, "B", "icon.png", AssetKind::Icon));
        integrity.add_corrupted(
            part(Category::Item, "C", "icon.png", AssetKind::Icon),
            CorruptionReason::SizeMismatch {
                expected: 10,
                actual: 3,
            },
        );

        let completed: BTreeSet<String> = ["A".to_string()].into_iter().collect();
        let tasks = QueueBuilder::new().build(&integrity, &completed);

        let items: Vec<_> = tasks.iter().map(|t| t.item_key.as_str()).collect();
        assert_eq!(items, vec!["B", "C"]);
    }

    /// Test whole-item retry
    ///
    /// Verifies an incomplete item with one missing file is queued with all
    /// of its files, while untouched items stay out of the queue.
    #[test]
    fn test_incomplete_item_is_queued_whole() {
        let mut integrity = IntegrityResult::new();
        integrity.add_valid(part(Category::Item, "1001", "data.json", AssetKind::Data));
        integrity.add_missing(part(Category::Item, "1001", "icon.png", AssetKind::Icon));
        integrity.add_valid(part(Category::Item, "1004", "data.json", AssetKind::Data));
        integrity.add_valid(part(Category::Item, "1004", "icon.png", AssetKind::Icon));

        let tasks = QueueBuilder::new().build(&integrity, &BTreeSet::new());
        let keys: Vec<_> = tasks.iter().map(|t| t.target_key.as_str()).collect();
        assert_eq!(keys, vec!["1/items/1001/icon.png", "1/items/1001/data.json"]);
        assert_eq!(parts_per_item(&tasks).get("1001"), Some(&2));
    }

    /// Test repairs of recorded items
    ///
    /// Verifies a recorded item only gets its broken file queued.
    #[test]
    fn test_recorded_item_repairs_only_broken_files() {
        let mut integrity = IntegrityResult::new();
        integrity.add_valid(part(Category::Item, "1001", "data.json", AssetKind::Data));
        integrity.add_corrupted(
            part(Category::Item, "1001", "icon.png", AssetKind::Icon),
            CorruptionReason::Stale {
                age: std::time::Duration::from_secs(60 * 86_400),
            },
        );

        let completed: BTreeSet<String> = ["1001".to_string()].into_iter().collect();
        let tasks = QueueBuilder::new().build(&integrity, &completed);
        let keys: Vec<_> = tasks.iter().map(|t| t.target_key.as_str()).collect();
        assert_eq!(keys, vec!["1/items/1001/icon.png"]);
    }

    /// Test queue ordering
    ///
    /// Verifies priority first, then larger parts first, then key order.
    #[test]
    fn test_build_orders_by_priority_then_size() {
        let mut integrity = IntegrityResult::new();
        integrity.add_missing(part(Category::Overlay, "o", "x.png", AssetKind::Overlay));
        integrity.add_missing(part(Category::Champion, "Ahri", "data.json", AssetKind::Data));
        integrity.add_missing(part(Category::Champion, "Ahri", "splash.jpg", AssetKind::Splash));
        integrity.add_missing(part(Category::Item, "1001", "icon.png", AssetKind::Icon));
        integrity.add_missing(part(Category::Champion, "Ahri", "square.png", AssetKind::Icon));
        integrity.add_missing(part(Category::Champion, "Annie", "square.png", AssetKind::Icon));

        let tasks = QueueBuilder::new().build(&integrity, &BTreeSet::new());
        let keys: Vec<_> = tasks.iter().map(|t| t.target_key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "1/champions/Ahri/splash.jpg",
                "1/champions/Ahri/square.png",
                "1/champions/Annie/square.png",
                "1/champions/Ahri/data.json",
                "1/items/1001/icon.png",
                "1/overlay/o/x.png",
            ]
        );
    }

    #[test]
    fn test_duplicate_parts_are_queued_once() {
        let mut integrity = IntegrityResult::new();
        let p = part(Category::Spell, "SummonerFlash", "icon.png", AssetKind::Icon);
        integrity.add_missing(p.clone());
        integrity.add_missing(p);

        let tasks = QueueBuilder::new().build(&integrity, &BTreeSet::new());
        assert_eq!(tasks.len(), 1);
        assert_eq!(parts_per_item(&tasks).get("SummonerFlash"), Some(&1));
    }
}
