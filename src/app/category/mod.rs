//! Per-category cache synchronization
//!
//! One [`CategoryCacheService`] per asset category checks the cached files of
//! every catalog item, queues what is missing or corrupted, runs the queue on
//! the shared worker pools and records every written file right away. An
//! item joins the manifest's completed set once all of its queued parts
//! succeeded; partially downloaded items stay out of it and are retried as a
//! whole on the next run.

pub mod service;
pub mod tracker;
pub mod types;

pub use service::CategoryCacheService;
pub use tracker::ItemTracker;
pub use types::{
    CacheCompleteness, CategoryProgress, CategoryProgressFn, CategorySyncReport, Stage,
};
