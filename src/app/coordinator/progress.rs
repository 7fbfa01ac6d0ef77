//! Cross-category progress aggregation and fan-out
//!
//! [`ProgressAggregator`] folds per-category ticks into one overall snapshot
//! and hands it to every subscriber registered on the [`ProgressHub`].
//! Snapshots are emitted while the aggregator lock is held, so subscribers
//! observe them in the order they were computed and the overall percentage
//! never goes backwards.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::app::category::{CategoryProgress, CategorySyncReport, Stage};
use crate::app::models::Category;
use crate::app::worker::ProgressThrottle;

/// Sum over every counted category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverallProgress {
    pub completed_assets: usize,
    pub total_assets: usize,
    pub percentage: f64,
}

/// State of one category as seen by subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStatus {
    pub category: Category,
    pub stage: Stage,
    pub current: usize,
    pub total: usize,
}

/// Unified progress emitted to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub stage: Stage,
    pub current: usize,
    pub total: usize,
    /// Category that triggered this snapshot
    pub category: Option<Category>,
    pub current_asset: Option<String>,
    pub overall: OverallProgress,
    pub categories: Vec<CategoryStatus>,
    pub downloaded_files: usize,
    pub failed_files: usize,
    pub errors: Vec<String>,
}

/// Identifies a subscription for [`ProgressHub::unsubscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

/// Registry of progress subscribers
#[derive(Default)]
pub struct ProgressHub {
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_id: AtomicU64,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ProgressSnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((id, Arc::new(callback)));
        id
    }

    /// Returns false when the id was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|p| p.into_inner());
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every subscriber synchronously
    ///
    /// The registry lock is released first, so a callback may subscribe or
    /// unsubscribe.
    pub fn emit(&self, snapshot: &ProgressSnapshot) {
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in subscribers {
            callback(snapshot);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CategoryCounts {
    stage: Stage,
    current: usize,
    total: usize,
}

struct AggregatorState {
    stage: Stage,
    categories: BTreeMap<Category, CategoryCounts>,
    percentage: f64,
    downloaded_files: usize,
    failed_files: usize,
    errors: Vec<String>,
    throttle: ProgressThrottle,
}

/// Combines category ticks into overall snapshots for one run
pub struct ProgressAggregator {
    state: Mutex<AggregatorState>,
    hub: Arc<ProgressHub>,
}

impl ProgressAggregator {
    pub fn new(hub: Arc<ProgressHub>, interval: Duration) -> Self {
        Self {
            state: Mutex::new(AggregatorState {
                stage: Stage::Idle,
                categories: BTreeMap::new(),
                percentage: 0.0,
                downloaded_files: 0,
                failed_files: 0,
                errors: Vec::new(),
                throttle: ProgressThrottle::new(interval),
            }),
            hub,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn stage(&self) -> Stage {
        self.lock().stage
    }

    /// Move the run to `stage`; always emitted
    pub fn set_stage(&self, stage: Stage) {
        let mut state = self.lock();
        state.stage = stage;
        let snapshot = Self::snapshot(&mut state, None, None);
        state.throttle.should_emit(true);
        self.hub.emit(&snapshot);
    }

    /// Register a counted category before any download starts
    pub fn set_totals(&self, category: Category, completed: usize, total: usize) {
        let mut state = self.lock();
        state.categories.insert(
            category,
            CategoryCounts {
                stage: Stage::Counting,
                current: completed.min(total),
                total,
            },
        );
    }

    /// Fold in a category tick
    ///
    /// Stage changes bypass the throttle.
    pub fn on_category(&self, progress: &CategoryProgress) {
        let mut state = self.lock();
        let previous = state.categories.insert(
            progress.category,
            CategoryCounts {
                stage: progress.stage,
                current: progress.current.min(progress.total),
                total: progress.total,
            },
        );
        let mut force = previous.map_or(true, |p| p.stage != progress.stage);

        if progress.stage == Stage::Downloading && state.stage == Stage::Checking {
            state.stage = Stage::Downloading;
            force = true;
        }

        if state.throttle.should_emit(force) {
            let snapshot = Self::snapshot(
                &mut state,
                Some(progress.category),
                progress.current_asset.clone(),
            );
            self.hub.emit(&snapshot);
        }
    }

    /// Mark a category as structurally failed; always emitted
    pub fn category_failed(&self, category: Category, error: &str) {
        let mut state = self.lock();
        let counts = state.categories.entry(category).or_insert(CategoryCounts {
            stage: Stage::Error,
            current: 0,
            total: 0,
        });
        counts.stage = Stage::Error;
        state.errors.push(format!("{}: {}", category, error));
        let snapshot = Self::snapshot(&mut state, Some(category), None);
        state.throttle.should_emit(true);
        self.hub.emit(&snapshot);
    }

    /// Add the file counts and errors of a finished category
    pub fn record_report(&self, report: &CategorySyncReport) {
        let mut state = self.lock();
        state.downloaded_files += report.batch.downloaded;
        state.failed_files += report.batch.failed;
        let category = report.category;
        state.errors.extend(
            report
                .batch
                .errors
                .iter()
                .map(|e| format!("{}: {}", category, e)),
        );
        state.errors.extend(report.manifest_errors.iter().cloned());
        debug!(
            "{} finished: {} files downloaded, {} failed",
            category, report.batch.downloaded, report.batch.failed
        );
    }

    /// Emit the terminal snapshot
    pub fn finish(&self, stage: Stage) -> ProgressSnapshot {
        let mut state = self.lock();
        state.stage = stage;
        let snapshot = Self::snapshot(&mut state, None, None);
        state.throttle.should_emit(true);
        self.hub.emit(&snapshot);
        snapshot
    }

    fn snapshot(
        state: &mut AggregatorState,
        category: Option<Category>,
        current_asset: Option<String>,
    ) -> ProgressSnapshot {
        let completed: usize = state.categories.values().map(|c| c.current).sum();
        let total: usize = state.categories.values().map(|c| c.total).sum();
        let computed = if total == 0 {
            if state.stage == Stage::Complete {
                100.0
            } else {
                0.0
            }
        } else {
            completed as f64 / total as f64 * 100.0
        };
        state.percentage = state.percentage.max(computed);

        let (current, total_for_snapshot) = match category.and_then(|c| state.categories.get(&c)) {
            Some(counts) => (counts.current, counts.total),
            None => (completed, total),
        };

        ProgressSnapshot {
            stage: state.stage,
            current,
            total: total_for_snapshot,
            category,
            current_asset,
            overall: OverallProgress {
                completed_assets: completed,
                total_assets: total,
                percentage: state.percentage,
            },
            categories: state
                .categories
                .iter()
                .map(|(category, counts)| CategoryStatus {
                    category: *category,
                    stage: counts.stage,
                    current: counts.current,
                    total: counts.total,
                })
                .collect(),
            downloaded_files: state.downloaded_files,
            failed_files: state.failed_files,
            errors: state.errors.clone(),
        }
    }
}
