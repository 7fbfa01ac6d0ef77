//! Bounded concurrent execution of download tasks
//!
//! The scheduler pulls tasks from its queue only once a worker slot is free,
//! runs each on its own tokio task with a per-attempt timeout and the shared
//! retry helper, and reports every outcome back on the calling task. That
//! keeps [`TaskObserver`] callbacks serial, so observers need no locking of
//! their own.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::config::SchedulerConfig;
use super::control::{RunControl, RunState};
use super::pools::{Slot, SlotPools};
use super::progress::{BatchProgress, ProgressThrottle};
use super::retry::{retry_with_backoff_while, RetryPolicy};
use super::types::{BatchResult, TaskError, TaskOutcome};
use crate::app::host::{AssetHost, WrittenAsset};
use crate::app::layout::TaskSource;
use crate::app::models::Category;
use crate::app::queue::DownloadTask;
use crate::errors::{DownloadError, HostError, HostResult};

/// Receives task outcomes, one at a time, in completion order
#[async_trait]
pub trait TaskObserver: Send + Sync {
    async fn on_succeeded(&self, task: &DownloadTask, asset: &WrittenAsset);

    async fn on_failed(&self, _task: &DownloadTask, _error: &TaskError) {}
}

/// Observer that ignores every outcome
pub struct NoopObserver;

#[async_trait]
impl TaskObserver for NoopObserver {
    async fn on_succeeded(&self, _task: &DownloadTask, _asset: &WrittenAsset) {}
}

/// Callback receiving throttled batch progress
pub type ProgressFn<'a> = &'a (dyn Fn(&BatchProgress) + Send + Sync);

/// Runs download tasks under the slot pools of a run
pub struct WorkerScheduler {
    host: Arc<dyn AssetHost>,
    pools: Arc<SlotPools>,
    control: RunControl,
    policy: RetryPolicy,
    task_timeout: Duration,
    progress_interval: Duration,
}

impl WorkerScheduler {
    /// Scheduler sharing `pools` and `control` with the rest of a run
    pub fn new(
        host: Arc<dyn AssetHost>,
        config: &SchedulerConfig,
        pools: Arc<SlotPools>,
        control: RunControl,
    ) -> Self {
        Self {
            host,
            pools,
            control,
            policy: config.retry_policy(),
            task_timeout: config.task_timeout,
            progress_interval: config.progress_interval,
        }
    }

    /// Scheduler with its own pools and control
    pub fn standalone(host: Arc<dyn AssetHost>, config: &SchedulerConfig) -> Self {
        let pools = Arc::new(SlotPools::new(config));
        Self::new(host, config, pools, RunControl::new())
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    pub fn pools(&self) -> &Arc<SlotPools> {
        &self.pools
    }

    /// Execute `tasks` until the queue drains or the run is cancelled
    ///
    /// Never fails as a whole: per-task failures are counted, passed to
    /// `observer` and listed in the result.
    pub async fn run(
        &self,
        tasks: Vec<DownloadTask>,
        observer: &dyn TaskObserver,
        on_progress: ProgressFn<'_>,
    ) -> BatchResult {
        let started = Instant::now();
        let total = tasks.len();
        let mut queue: VecDeque<DownloadTask> = tasks.into();
        let mut in_flight: JoinSet<(DownloadTask, TaskOutcome)> = JoinSet::new();
        let mut progress = BatchProgress::new(total);
        let mut throttle = ProgressThrottle::new(self.progress_interval);
        let mut result = BatchResult {
            total,
            ..Default::default()
        };

        if total > 0 {
            info!(
                "Scheduling {} tasks ({} slots shared by this run)",
                total,
                self.pools.max_concurrency()
            );
        }

        loop {
            if self.control.is_cancelled() && !queue.is_empty() {
                debug!("Dropping {} queued tasks after cancellation", queue.len());
                result.skipped += queue.len();
                queue.clear();
            }
            if queue.is_empty() && in_flight.is_empty() {
                break;
            }

            let next_category = queue.front().map(|task| task.category);

            tokio::select! {
                joined = in_flight.join_next(), if !in_flight.is_empty() => {
                    let Some(joined) = joined else { continue };
                    let (task, outcome) = match joined {
                        Ok(finished) => finished,
                        Err(e) => {
                            warn!("Worker task ended abnormally: {}", e);
                            continue;
                        }
                    };
                    self.record(task, outcome, observer, &mut result, &mut progress)
                        .await;
                    if !self.control.is_cancelled() && throttle.should_emit(false) {
                        on_progress(&progress);
                    }
                }
                slot = self.next_slot(next_category), if next_category.is_some() => {
                    let Some(slot) = slot else { continue };
                    let Some(task) = queue.pop_front() else { continue };
                    self.spawn(&mut in_flight, task, slot);
                }
                _ = self.control.cancelled(), if next_category.is_some() => {}
            }
        }

        // Terminal update is never throttled
        on_progress(&progress);

        result.cancelled = self.control.is_cancelled();
        result.elapsed = started.elapsed();
        if total > 0 {
            info!(
                "Batch finished: {} downloaded, {} failed, {} skipped in {:.1}s",
                result.downloaded,
                result.failed,
                result.skipped,
                result.elapsed.as_secs_f64()
            );
        }
        result
    }

    /// Wait until the run may dequeue and a slot is free
    ///
    /// `None` means the state changed while waiting; the caller re-evaluates.
    async fn next_slot(&self, category: Option<Category>) -> Option<Slot> {
        let category = category?;
        if !self.control.wait_until_runnable().await {
            return None;
        }
        let slot = self.pools.acquire(category).await;
        if self.control.state() != RunState::Running {
            return None;
        }
        Some(slot)
    }

    fn spawn(
        &self,
        in_flight: &mut JoinSet<(DownloadTask, TaskOutcome)>,
        task: DownloadTask,
        slot: Slot,
    ) {
        let host = self.host.clone();
        let policy = self.policy.clone();
        let control = self.control.clone();
        let timeout = self.task_timeout;

        in_flight.spawn(async move {
            let attempt = execute_task(host.as_ref(), &task, &policy, timeout, &control);
            let outcome = AssertUnwindSafe(attempt).catch_unwind().await;
            drop(slot);
            let outcome = outcome.unwrap_or_else(|_| {
                TaskOutcome::Failed(TaskError::new(&task, "worker panicked", 1))
            });
            (task, outcome)
        });
    }

    async fn record(
        &self,
        task: DownloadTask,
        outcome: TaskOutcome,
        observer: &dyn TaskObserver,
        result: &mut BatchResult,
        progress: &mut BatchProgress,
    ) {
        // Results arriving after cancellation are discarded
        if self.control.is_cancelled() {
            result.skipped += 1;
            return;
        }

        match outcome {
            TaskOutcome::Succeeded(asset) => {
                debug!("Stored {} ({} bytes)", task.target_key, asset.size);
                result.downloaded += 1;
                progress.completed += 1;
                observer.on_succeeded(&task, &asset).await;
            }
            TaskOutcome::Failed(error) => {
                warn!("Task failed permanently: {}", error);
                result.failed += 1;
                progress.failed += 1;
                observer.on_failed(&task, &error).await;
                result.errors.push(error);
            }
            TaskOutcome::Interrupted => {
                result.skipped += 1;
                return;
            }
        }
        progress.current_asset = Some(task.target_key);
    }
}

/// Run one task through the shared retry helper
async fn execute_task(
    host: &dyn AssetHost,
    task: &DownloadTask,
    policy: &RetryPolicy,
    timeout: Duration,
    control: &RunControl,
) -> TaskOutcome {
    let label = format!("Download of {}", task.target_key);
    let result = retry_with_backoff_while(
        policy,
        &label,
        || !control.is_cancelled(),
        |_| attempt_once(host, task, timeout),
    )
    .await;

    match result {
        Ok(asset) => TaskOutcome::Succeeded(asset),
        Err(failure) if failure.interrupted => TaskOutcome::Interrupted,
        Err(failure) => TaskOutcome::Failed(TaskError::new(
            task,
            failure.error.to_string(),
            failure.attempts,
        )),
    }
}

/// One bounded attempt against the host
async fn attempt_once(
    host: &dyn AssetHost,
    task: &DownloadTask,
    timeout: Duration,
) -> HostResult<WrittenAsset> {
    let write = async {
        match &task.source {
            TaskSource::Remote(url) => {
                host.write_asset(url, task.category, &task.target_key)
                    .await
            }
            TaskSource::Inline(bytes) => {
                host.write_bytes(task.category, &task.target_key, bytes)
                    .await
            }
        }
    };

    match tokio::time::timeout(timeout, write).await {
        Ok(result) => result,
        Err(_) => Err(HostError::Network(DownloadError::Timeout {
            seconds: timeout.as_secs(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::host::FileStat;
    use crate::app::layout::AssetPart;
    use crate::app::models::AssetKind;
    use crate::app::worker::config::ConfigPresets;
    use crate::errors::FilesystemError;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Host whose writes take a little time and fail for chosen keys
    #[derive(Default)]
    struct ScriptedHost {
        fail_always: Vec<String>,
        fail_once: Mutex<HashMap<String, bool>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedHost {
        async fn write(&self, key: &str) -> HostResult<WrittenAsset> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let flaky = self
                .fail_once
                .lock()
                .unwrap()
                .insert(key.to_string(), false)
                .unwrap_or(false);
            if flaky || self.fail_always.iter().any(|k| k == key) {
                return Err(HostError::Network(DownloadError::ServerError { status: 500 }));
            }
            Ok(WrittenAsset {
                local_path: PathBuf::from(key),
                size: 1,
                checksum: "x".into(),
            })
        }
    }

    #[async_trait]
    impl AssetHost for ScriptedHost {
        async fn file_exists(&self, _key: &str) -> HostResult<FileStat> {
            Ok(FileStat::missing())
        }
        async fn file_size(&self, _key: &str) -> HostResult<u64> {
            Ok(0)
        }
        async fn read_asset(&self, _key: &str) -> HostResult<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn write_asset(
            &self,
            _url: &str,
            _category: Category,
            key: &str,
        ) -> HostResult<WrittenAsset> {
            self.write(key).await
        }
        async fn write_bytes(
            &self,
            _category: Category,
            key: &str,
            _bytes: &[u8],
        ) -> HostResult<WrittenAsset> {
            self.write(key).await
        }
        async fn remove_assets(&self, _category: Option<Category>) -> HostResult<usize> {
            Ok(0)
        }
    }

    fn task(n: usize) -> DownloadTask {
        DownloadTask::from_part(AssetPart {
            category: Category::Item,
            item_key: format!("item{}", n),
            target_key: format!("1/items/item{}/icon.png", n),
            kind: AssetKind::Icon,
            source: TaskSource::Remote(format!("https://cdn.test/{}.png", n)),
        })
    }

    fn config(cap: usize, attempts: u32) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrency: cap,
            max_attempts: attempts,
            ..ConfigPresets::testing()
        }
    }

    /// Test partial failure handling
    ///
    /// Verifies five tasks with one permanent failure end with four
    /// downloads, one failure and exactly one error entry.
    #[tokio::test]
    async fn test_single_failure_does_not_abort_batch() {
        let host = Arc::new(ScriptedHost {
            fail_always: vec!["1/items/item3/icon.png".into()],
            delay: Duration::from_millis(5),
            ..Default::default()
        });
        let scheduler = WorkerScheduler::standalone(host.clone(), &config(2, 3));

        let tasks = (1..=5).map(task).collect();
        let result = scheduler.run(tasks, &NoopObserver, &|_| {}).await;

        assert_eq!(result.downloaded, 4);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].item_key, "item3");
        assert_eq!(result.errors[0].attempts, 3);
        assert!(!result.cancelled);
        assert!(host.peak.load(Ordering::SeqCst) <= 2);
    }

    /// Test retries of transient failures
    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let host = Arc::new(ScriptedHost::default());
        host.fail_once
            .lock()
            .unwrap()
            .insert("1/items/item1/icon.png".into(), true);
        let scheduler = WorkerScheduler::standalone(host.clone(), &config(4, 2));

        let result = scheduler.run(vec![task(1)], &NoopObserver, &|_| {}).await;
        assert_eq!(result.downloaded, 1);
        assert_eq!(result.failed, 0);
        assert_eq!(host.calls.load(Ordering::SeqCst), 2);
    }

    /// Test non-retryable failures
    ///
    /// Verifies an invalid key fails after a single attempt.
    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        struct RejectingHost;

        #[async_trait]
        impl AssetHost for RejectingHost {
            async fn file_exists(&self, _key: &str) -> HostResult<FileStat> {
                Ok(FileStat::missing())
            }
            async fn file_size(&self, _key: &str) -> HostResult<u64> {
                Ok(0)
            }
            async fn read_asset(&self, _key: &str) -> HostResult<Vec<u8>> {
                Ok(Vec::new())
            }
            async fn write_asset(
                &self,
                _url: &str,
                _category: Category,
                key: &str,
            ) -> HostResult<WrittenAsset> {
                Err(HostError::Filesystem(FilesystemError::InvalidKey {
                    key: key.to_string(),
                }))
            }
            async fn write_bytes(
                &self,
                _category: Category,
                _key: &str,
                _bytes: &[u8],
            ) -> HostResult<WrittenAsset> {
                unreachable!()
            }
            async fn remove_assets(&self, _category: Option<Category>) -> HostResult<usize> {
                Ok(0)
            }
        }

        let scheduler = WorkerScheduler::standalone(Arc::new(RejectingHost), &config(2, 3));
        let result = scheduler.run(vec![task(1)], &NoopObserver, &|_| {}).await;
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].attempts, 1);
    }

    /// Test the per-attempt timeout
    #[tokio::test]
    async fn test_slow_attempts_time_out() {
        let host = Arc::new(ScriptedHost {
            delay: Duration::from_millis(200),
            ..Default::default()
        });
        let mut config = config(2, 1);
        config.task_timeout = Duration::from_millis(20);
        let scheduler = WorkerScheduler::standalone(host, &config);

        let result = scheduler.run(vec![task(1)], &NoopObserver, &|_| {}).await;
        assert_eq!(result.failed, 1);
        assert!(result.errors[0].message.contains("timed out"));
    }

    /// Test cancellation before start
    ///
    /// Verifies a cancelled run dequeues nothing and reports itself cancelled.
    #[tokio::test]
    async fn test_cancelled_run_dequeues_nothing() {
        let host = Arc::new(ScriptedHost::default());
        let scheduler = WorkerScheduler::standalone(host.clone(), &config(2, 1));
        scheduler.control().cancel();

        let result = scheduler
            .run((1..=3).map(task).collect(), &NoopObserver, &|_| {})
            .await;
        assert!(result.cancelled);
        assert_eq!(result.downloaded, 0);
        assert_eq!(result.skipped, 3);
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    /// Test the terminal progress update
    ///
    /// Verifies the last emission always reflects every finished task even
    /// when throttling would suppress it.
    #[tokio::test]
    async fn test_final_progress_is_always_emitted() {
        let host = Arc::new(ScriptedHost::default());
        let mut config = config(4, 1);
        config.progress_interval = Duration::from_secs(3600);
        let scheduler = WorkerScheduler::standalone(host, &config);

        let seen = Mutex::new(Vec::new());
        let result = scheduler
            .run((1..=6).map(task).collect(), &NoopObserver, &|p: &BatchProgress| {
                seen.lock().unwrap().push(p.clone())
            })
            .await;

        let seen = seen.into_inner().unwrap();
        assert_eq!(result.downloaded, 6);
        assert!(seen.len() <= 2);
        assert_eq!(seen.last().unwrap().completed, 6);
    }
}
