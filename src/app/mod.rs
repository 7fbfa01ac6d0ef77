//! Core application logic for the Data Dragon asset cache
//!
//! This module contains the catalog client, the host capabilities the cache
//! writes through, the per-category manifests, integrity checking, task
//! scheduling and the run orchestration on top of them.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ddragon_cache::app::{
//!     AssetLayout, Category, CatalogClient, ClientConfig, DataDragonSource, HttpHandler,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let http = Arc::new(HttpHandler::new(config.build_http_client()?, config.rate_limit_rps)?);
//! let catalog = CatalogClient::new(Arc::new(DataDragonSource::new(http, config.clone())));
//!
//! let version = catalog.resolve_version().await;
//! let champions = catalog.entries(Category::Champion, &version).await?;
//! let layout = AssetLayout::from_client_config(&config);
//!
//! for entry in champions.iter().take(3) {
//!     for part in layout.parts(Category::Champion, &version, entry) {
//!         println!("{} <- {}", part.target_key, part.source.label());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod category;
pub mod client;
pub mod coordinator;
pub mod host;
pub mod integrity;
pub mod layout;
pub mod manifest;
pub mod models;
pub mod queue;
pub mod worker;

// Re-export main public API
pub use category::{CacheCompleteness, CategoryCacheService, CategoryProgress, Stage};
pub use client::{CatalogClient, CatalogEntry, CatalogSource, ClientConfig, DataDragonSource, HttpHandler};
pub use coordinator::{
    BootstrapConfig, Bootstrapper, ClearReport, ProgressSnapshot, RunSummary, SignalHandler,
    SubscriptionId,
};
pub use host::{AssetHost, FsHost, ManifestStorage, NullHost};
pub use integrity::{IntegrityChecker, IntegrityConfig, IntegrityReport, IntegrityResult};
pub use layout::{AssetLayout, AssetPart, TaskSource};
pub use manifest::{CategoryManifest, ManifestStore};
pub use models::{AssetKind, AssetVersion, Category};
pub use queue::{DownloadTask, QueueBuilder};
pub use worker::{BatchResult, RunControl, SchedulerConfig, WorkerScheduler};
