//! Scheduler tests against the in-memory host
//!
//! Covers slot sharing between concurrently running category batches and
//! the pause and cancel controls.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ddragon_cache::app::host::WrittenAsset;
use ddragon_cache::app::worker::{
    BatchProgress, ConfigPresets, NoopObserver, RunControl, SlotPools, TaskError, TaskObserver,
};
use ddragon_cache::app::{
    AssetKind, Category, DownloadTask, SchedulerConfig, TaskSource, WorkerScheduler,
};
use ddragon_cache::app::layout::AssetPart;

use common::MemoryHost;

fn task(category: Category, n: usize) -> DownloadTask {
    DownloadTask::from_part(AssetPart {
        category,
        item_key: format!("{}{}", category.as_str(), n),
        target_key: format!("1/{}/{}{}/icon.png", category.dir_name(), category.as_str(), n),
        kind: AssetKind::Icon,
        source: TaskSource::Remote(format!("https://cdn.test/{}/{}.png", category, n)),
    })
}

fn tasks(category: Category, count: usize) -> Vec<DownloadTask> {
    (0..count).map(|n| task(category, n)).collect()
}

fn config(cap: usize) -> SchedulerConfig {
    SchedulerConfig {
        max_concurrency: cap,
        ..ConfigPresets::testing()
    }
}

fn ignore_progress(_: &BatchProgress) {}

/// Records outcomes in the order the scheduler reports them
#[derive(Default)]
struct RecordingObserver {
    succeeded: Mutex<Vec<String>>,
    failed: Mutex<Vec<String>>,
}

#[async_trait]
impl TaskObserver for RecordingObserver {
    async fn on_succeeded(&self, task: &DownloadTask, _asset: &WrittenAsset) {
        self.succeeded.lock().unwrap().push(task.target_key.clone());
    }

    async fn on_failed(&self, task: &DownloadTask, _error: &TaskError) {
        self.failed.lock().unwrap().push(task.target_key.clone());
    }
}

/// Test shared global cap
///
/// Verifies two batches running at once on the same pools never exceed the
/// global cap together.
#[tokio::test]
async fn test_concurrent_batches_share_global_cap() {
    let host = Arc::new(MemoryHost::with_delay(Duration::from_millis(5)));
    let config = config(3);
    let pools = Arc::new(SlotPools::new(&config));
    let control = RunControl::new();

    let champions = WorkerScheduler::new(host.clone(), &config, pools.clone(), control.clone());
    let spells = WorkerScheduler::new(host.clone(), &config, pools.clone(), control);

    let (a, b) = tokio::join!(
        champions.run(tasks(Category::Champion, 12), &NoopObserver, &ignore_progress),
        spells.run(tasks(Category::Spell, 12), &NoopObserver, &ignore_progress),
    );

    assert_eq!(a.downloaded + b.downloaded, 24);
    assert!(host.peak_in_flight() <= 3);
    assert_eq!(pools.in_use(), 0);
}

/// Test observer reporting
///
/// Verifies every success and failure reaches the observer exactly once.
#[tokio::test]
async fn test_observer_sees_every_outcome() {
    let host = Arc::new(MemoryHost::new());
    host.fail_key("1/items/item2/icon.png");
    let scheduler = WorkerScheduler::standalone(host.clone(), &config(2));
    let observer = RecordingObserver::default();

    let result = scheduler
        .run(tasks(Category::Item, 5), &observer, &ignore_progress)
        .await;

    assert_eq!(result.downloaded, 4);
    assert_eq!(result.failed, 1);
    assert_eq!(observer.succeeded.lock().unwrap().len(), 4);
    assert_eq!(
        *observer.failed.lock().unwrap(),
        vec!["1/items/item2/icon.png".to_string()]
    );
    assert_eq!(result.errors[0].item_key, "item2");
}

/// Test pause before dequeue
///
/// Verifies a paused run starts nothing until resumed.
#[tokio::test]
async fn test_paused_run_waits_for_resume() {
    let host = Arc::new(MemoryHost::new());
    let scheduler = Arc::new(WorkerScheduler::standalone(host.clone(), &config(2)));
    assert!(scheduler.control().pause());

    let running = scheduler.clone();
    let handle = tokio::spawn(async move {
        running
            .run(tasks(Category::Rune, 4), &NoopObserver, &ignore_progress)
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.write_count(), 0);

    assert!(scheduler.control().resume());
    let result = handle.await.unwrap();
    assert_eq!(result.downloaded, 4);
    assert!(!result.cancelled);
}

/// Test cancellation accounting
///
/// Verifies a cancelled batch accounts for every task as downloaded or
/// skipped.
#[tokio::test]
async fn test_cancel_accounts_for_every_task() {
    let host = Arc::new(MemoryHost::with_delay(Duration::from_millis(20)));
    let scheduler = Arc::new(WorkerScheduler::standalone(host.clone(), &config(1)));

    let running = scheduler.clone();
    let handle = tokio::spawn(async move {
        running
            .run(tasks(Category::Item, 10), &NoopObserver, &ignore_progress)
            .await
    });

    while host.write_count() < 2 {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    scheduler.control().cancel();

    let result = handle.await.unwrap();
    assert!(result.cancelled);
    assert_eq!(result.failed, 0);
    assert_eq!(result.downloaded + result.skipped, result.total);
    assert!(result.skipped > 0);
}
