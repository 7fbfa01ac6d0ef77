//! Run orchestration and progress coordination
//!
//! The [`Bootstrapper`] is the control plane of the cache. A run moves
//! through `idle → counting → checking → downloading → complete | error`:
//!
//! 1. **Counting**: resolve the version and diff every category's catalog
//!    against its manifest, so percentages mean something before any
//!    download starts. A category whose catalog cannot be fetched is marked
//!    `error` here and skipped; its siblings carry on.
//! 2. **Checking / downloading**: run one [`CategoryCacheService`] per
//!    category, at most `max_parallel_categories` at a time. All categories
//!    share one set of worker slot pools, so the global concurrency cap holds
//!    across the whole run.
//! 3. **Complete / error**: `error` only when some category failed
//!    structurally. Failed files alone still end in `complete`, with the
//!    failures listed in the terminal snapshot.
//!
//! # Architecture
//!
//! - [`config`] - Configuration structures and validation
//! - [`progress`] - Overall progress aggregation and subscriber fan-out
//! - [`stats`] - Run summaries
//! - [`signals`] - Signal handling for graceful shutdown
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ddragon_cache::app::{
//!     AssetLayout, BootstrapConfig, Bootstrapper, CatalogClient, ClientConfig,
//!     DataDragonSource, FsHost, HttpHandler,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client_config = ClientConfig::default();
//! let http = Arc::new(HttpHandler::new(
//!     client_config.build_http_client()?,
//!     client_config.rate_limit_rps,
//! )?);
//! let source = DataDragonSource::new(http.clone(), client_config.clone());
//! let catalog = Arc::new(CatalogClient::new(Arc::new(source)));
//! let host = Arc::new(FsHost::new("./cache".into(), http).await?);
//!
//! let bootstrapper = Bootstrapper::new(
//!     BootstrapConfig::default(),
//!     catalog,
//!     host.clone(),
//!     host,
//!     AssetLayout::from_client_config(&client_config),
//! )?;
//! bootstrapper.on_progress(|snapshot| {
//!     println!("{} {:.1}%", snapshot.stage, snapshot.overall.percentage);
//! });
//!
//! let summary = bootstrapper.start().await?;
//! println!("{}", summary.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod progress;
pub mod signals;
pub mod stats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info};

use crate::app::category::{
    CacheCompleteness, CategoryCacheService, CategoryProgress, CategorySyncReport, Stage,
};
use crate::app::client::CatalogClient;
use crate::app::host::{AssetHost, ManifestStorage};
use crate::app::integrity::{IntegrityChecker, IntegrityReport};
use crate::app::layout::AssetLayout;
use crate::app::manifest::ManifestStore;
use crate::app::models::{AssetVersion, Category};
use crate::app::worker::{RunControl, SlotPools, WorkerScheduler};
use crate::errors::{BootstrapError, BootstrapResult, CatalogResult};

pub use config::BootstrapConfig;
pub use progress::{
    CategoryStatus, OverallProgress, ProgressAggregator, ProgressHub, ProgressSnapshot,
    SubscriptionId,
};
pub use signals::SignalHandler;
pub use stats::{format_duration, CategoryOutcome, RunSummary};

/// What `clear_cache` removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub assets_removed: usize,
    pub manifests_removed: usize,
}

struct Inner {
    config: BootstrapConfig,
    catalog: Arc<CatalogClient>,
    store: Arc<ManifestStore>,
    host: Arc<dyn AssetHost>,
    checker: Arc<IntegrityChecker>,
    layout: Arc<AssetLayout>,
    pools: Arc<SlotPools>,
    control: RunControl,
    hub: Arc<ProgressHub>,
    running: AtomicBool,
    stage: Mutex<Stage>,
}

/// Clears the running flag when a run ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Top-level orchestrator of cache synchronization runs
///
/// Cheap to clone; clones share the same run state, so one clone can pause or
/// cancel a run started from another.
#[derive(Clone)]
pub struct Bootstrapper {
    inner: Arc<Inner>,
}

impl Bootstrapper {
    /// Create a bootstrapper over the injected host capabilities
    pub fn new(
        config: BootstrapConfig,
        catalog: Arc<CatalogClient>,
        host: Arc<dyn AssetHost>,
        storage: Arc<dyn ManifestStorage>,
        layout: AssetLayout,
    ) -> BootstrapResult<Self> {
        config
            .validate()
            .map_err(|reason| BootstrapError::InvalidConfig { reason })?;

        let pools = Arc::new(SlotPools::new(&config.scheduler));
        let checker = Arc::new(IntegrityChecker::new(
            host.clone(),
            config.integrity.clone(),
        ));
        Ok(Self {
            inner: Arc::new(Inner {
                catalog,
                store: Arc::new(ManifestStore::new(storage)),
                host,
                checker,
                layout: Arc::new(layout),
                pools,
                control: RunControl::new(),
                hub: Arc::new(ProgressHub::new()),
                running: AtomicBool::new(false),
                stage: Mutex::new(Stage::Idle),
                config,
            }),
        })
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.inner.config
    }

    /// Shared run control, for signal handlers and embedding hosts
    pub fn control(&self) -> &RunControl {
        &self.inner.control
    }

    /// Take the running flag until the guard drops
    fn claim(&self) -> BootstrapResult<RunningGuard<'_>> {
        self.inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| BootstrapError::AlreadyRunning)?;
        Ok(RunningGuard(&self.inner.running))
    }

    /// Whether a run or a cache clear holds the bootstrapper
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Stage of the current or last run
    pub fn stage(&self) -> Stage {
        *self.inner.stage.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_stage(&self, stage: Stage) {
        *self.inner.stage.lock().unwrap_or_else(|p| p.into_inner()) = stage;
    }

    /// Register a progress subscriber; called synchronously for every
    /// overall snapshot
    pub fn on_progress<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ProgressSnapshot) + Send + Sync + 'static,
    {
        self.inner.hub.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.hub.unsubscribe(id)
    }

    /// Stop dequeuing new downloads; in-flight ones finish
    pub fn pause(&self) -> bool {
        self.inner.control.pause()
    }

    pub fn resume(&self) -> bool {
        self.inner.control.resume()
    }

    /// Drop queued downloads and discard results still in flight
    pub fn cancel(&self) {
        self.inner.control.cancel();
    }

    /// Version a run would use now
    pub async fn version(&self) -> AssetVersion {
        self.inner.catalog.resolve_version().await
    }

    fn service(&self, category: Category) -> CategoryCacheService {
        let inner = &self.inner;
        let scheduler = WorkerScheduler::new(
            inner.host.clone(),
            &inner.config.scheduler,
            inner.pools.clone(),
            inner.control.clone(),
        );
        CategoryCacheService::new(
            category,
            inner.catalog.clone(),
            inner.store.clone(),
            inner.checker.clone(),
            inner.layout.clone(),
            scheduler,
        )
    }

    /// Run one full synchronization
    ///
    /// Fails only when another run is active. Category and item failures are
    /// reported in the returned summary and the terminal snapshot.
    pub async fn start(&self) -> BootstrapResult<RunSummary> {
        let inner = &self.inner;
        let _running = self.claim()?;

        inner.control.reset();
        inner.catalog.cache().clear();
        let started_at = Utc::now();
        let started = Instant::now();
        let parallel = inner.config.max_parallel_categories.max(1);

        let aggregator = ProgressAggregator::new(inner.hub.clone(), inner.config.progress_interval);
        self.set_stage(Stage::Counting);
        aggregator.set_stage(Stage::Counting);

        let version = inner.catalog.resolve_version().await;
        let services: Vec<CategoryCacheService> = inner
            .config
            .ordered_categories()
            .into_iter()
            .map(|category| self.service(category))
            .collect();
        info!(
            "Synchronizing {} categories for version {}",
            services.len(),
            version
        );

        let services = &services;
        let version = &version;
        let counted: Vec<(usize, CatalogResult<CacheCompleteness>)> =
            stream::iter(0..services.len())
                .map(|index| async move {
                    let result = services[index].check_cache_completeness(version).await;
                    (index, result)
                })
                .buffer_unordered(parallel)
                .collect()
                .await;

        let mut outcomes = Vec::new();
        let mut ready = Vec::new();
        for (index, result) in counted {
            let service = &services[index];
            match result {
                Ok(completeness) => {
                    aggregator.set_totals(
                        service.category(),
                        completeness.completed(),
                        completeness.total_expected,
                    );
                    ready.push((index, completeness));
                }
                Err(e) => {
                    error!("{} catalog unavailable: {}", service.category(), e);
                    aggregator.category_failed(service.category(), &e.to_string());
                    outcomes.push(CategoryOutcome::failed(service.category(), e.to_string()));
                }
            }
        }
        ready.sort_by_key(|(_, completeness)| {
            (completeness.category.priority(), completeness.category)
        });

        self.set_stage(Stage::Checking);
        aggregator.set_stage(Stage::Checking);

        let synced: Vec<(CacheCompleteness, Option<CatalogResult<CategorySyncReport>>)> =
            stream::iter(ready)
                .map(|(index, completeness)| {
                    let aggregator = &aggregator;
                    let control = &inner.control;
                    async move {
                        if control.is_cancelled() {
                            return (completeness, None);
                        }
                        let on_tick = |tick: &CategoryProgress| {
                            if tick.stage == Stage::Downloading {
                                self.set_stage(Stage::Downloading);
                            }
                            aggregator.on_category(tick)
                        };
                        let result = services[index].sync(version, &on_tick).await;
                        (completeness, Some(result))
                    }
                })
                .buffer_unordered(parallel)
                .collect()
                .await;

        for (completeness, result) in synced {
            let category = completeness.category;
            match result {
                None => outcomes.push(CategoryOutcome::skipped(
                    category,
                    completeness.total_expected,
                    completeness.completed(),
                )),
                Some(Ok(report)) => {
                    aggregator.record_report(&report);
                    outcomes.push(CategoryOutcome::from_report(&report));
                }
                Some(Err(e)) => {
                    error!("{} failed: {}", category, e);
                    aggregator.category_failed(category, &e.to_string());
                    outcomes.push(CategoryOutcome::failed(category, e.to_string()));
                }
            }
        }
        outcomes.sort_by_key(|o| (o.category.priority(), o.category));

        let stage = if outcomes.iter().any(|o| o.stage == Stage::Error) {
            Stage::Error
        } else {
            Stage::Complete
        };
        let snapshot = aggregator.finish(stage);
        self.set_stage(stage);

        let summary = RunSummary {
            version: version.clone(),
            stage,
            categories: outcomes,
            downloaded_files: snapshot.downloaded_files,
            failed_files: snapshot.failed_files,
            errors: snapshot.errors,
            cancelled: inner.control.is_cancelled(),
            started_at,
            duration: started.elapsed(),
        };
        info!("{}", summary.summary());
        Ok(summary)
    }

    /// Catalog-versus-manifest counts for every enabled category
    pub async fn completeness(&self) -> Vec<(Category, CatalogResult<CacheCompleteness>)> {
        let version = self.version().await;
        let services: Vec<CategoryCacheService> = self
            .inner
            .config
            .ordered_categories()
            .into_iter()
            .map(|category| self.service(category))
            .collect();

        let mut results = Vec::with_capacity(services.len());
        for service in &services {
            results.push((
                service.category(),
                service.check_cache_completeness(&version).await,
            ));
        }
        results
    }

    /// Read-only integrity check of every enabled category
    pub async fn verify(&self) -> (AssetVersion, IntegrityReport) {
        let inner = &self.inner;
        let version = self.version().await;
        let report = inner
            .checker
            .check_all_assets(
                &inner.catalog,
                &inner.store,
                &inner.layout,
                &inner.config.ordered_categories(),
                &version,
            )
            .await;
        (version, report)
    }

    /// Remove cached files and manifests of one category, or everything
    ///
    /// The next `start` re-checks the cleared categories from scratch.
    pub async fn clear_cache(&self, category: Option<Category>) -> BootstrapResult<ClearReport> {
        let _running = self.claim()?;
        let inner = &self.inner;

        let manifests_removed = inner
            .store
            .clear(category)
            .await
            .map_err(BootstrapError::ClearFailed)?;
        let assets_removed = inner
            .host
            .remove_assets(category)
            .await
            .map_err(BootstrapError::ClearFailed)?;

        match category {
            Some(category) => inner.catalog.cache().invalidate(category),
            None => inner.catalog.cache().clear(),
        }
        self.set_stage(Stage::Idle);

        info!(
            "Cleared {}: {} manifests, {} cached entries",
            category.map_or("all categories".to_string(), |c| c.to_string()),
            manifests_removed,
            assets_removed
        );
        Ok(ClearReport {
            assets_removed,
            manifests_removed,
        })
    }
}
