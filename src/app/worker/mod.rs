//! Bounded concurrent download execution
//!
//! Tasks run under a global concurrency cap shared by every category of a
//! run, partitioned into category-dedicated pools and one general overflow
//! pool. Each task gets a per-attempt timeout and is retried with exponential
//! backoff; a task that exhausts its attempts is recorded and the batch moves
//! on.
//!
//! # Module Organization
//!
//! - [`config`] - Scheduler configuration with validation and presets
//! - [`pools`] - Semaphore-backed dedicated, general and global slots
//! - [`control`] - Pause, resume and cancellation shared across a run
//! - [`progress`] - Batch counters and emission throttling
//! - [`retry`] - The retry-with-backoff helper used crate-wide
//! - [`scheduler`] - The dispatch loop
//! - [`types`] - Task and batch outcomes
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ddragon_cache::app::host::NullHost;
//! use ddragon_cache::app::worker::{ConfigPresets, NoopObserver, WorkerScheduler};
//!
//! # async fn example() {
//! let scheduler = WorkerScheduler::standalone(Arc::new(NullHost), &ConfigPresets::production());
//! let result = scheduler.run(Vec::new(), &NoopObserver, &|_| {}).await;
//! assert_eq!(result.downloaded, 0);
//! # }
//! ```

pub mod config;
pub mod control;
pub mod pools;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod types;

pub use config::{ConfigPresets, SchedulerConfig, SchedulerConfigBuilder};
pub use control::{RunControl, RunState};
pub use pools::{Lane, Slot, SlotPools};
pub use progress::{BatchProgress, ProgressThrottle};
pub use retry::{retry_with_backoff, retry_with_backoff_while, RetryFailure, RetryPolicy, Retryable};
pub use scheduler::{NoopObserver, ProgressFn, TaskObserver, WorkerScheduler};
pub use types::{BatchResult, TaskError, TaskOutcome};
