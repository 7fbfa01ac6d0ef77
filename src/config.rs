//! Configuration management for the asset cache
//!
//! This module provides the TOML configuration file, its lookup in standard
//! locations and the conversion into the runtime configurations consumed by
//! the catalog client and the bootstrapper.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{BootstrapConfig, Category, ClientConfig, IntegrityConfig, SchedulerConfig};
use crate::constants::{cache, ddragon, http, limits, logging, progress, workers};
use crate::errors::{AppError, ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Upstream catalog settings
    pub catalog: CatalogConfigToml,
    /// Cache location and integrity rules
    pub cache: CacheConfigToml,
    /// Worker scheduler settings
    pub scheduler: SchedulerConfigToml,
    /// Run orchestration settings
    pub bootstrap: BootstrapConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly catalog and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfigToml {
    pub base_url: String,
    pub cdn_url: String,
    pub locale: String,
    pub overlay_base_url: String,
    /// Use this version instead of the latest one
    pub pinned_version: Option<String>,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub version_timeout: Duration,
}

impl Default for CatalogConfigToml {
    fn default() -> Self {
        Self {
            base_url: ddragon::BASE_URL.to_string(),
            cdn_url: ddragon::CDN_URL.to_string(),
            locale: ddragon::DEFAULT_LOCALE.to_string(),
            overlay_base_url: ddragon::DEFAULT_OVERLAY_BASE_URL.to_string(),
            pinned_version: None,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            version_timeout: ddragon::VERSION_TIMEOUT,
        }
    }
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Cache directory path (None = platform cache directory)
    pub cache_root: Option<PathBuf>,
    /// Recorded files older than this are downloaded again
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
    /// Compare checksums during verification
    pub deep_verify: bool,
    /// Concurrent file checks per category
    pub integrity_concurrency: usize,
}

impl Default for CacheConfigToml {
    fn default() -> Self {
        let integrity = IntegrityConfig::default();
        Self {
            cache_root: None,
            max_age: cache::DEFAULT_MAX_AGE,
            deep_verify: integrity.deep,
            integrity_concurrency: integrity.concurrency,
        }
    }
}

/// TOML-friendly scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfigToml {
    /// Global concurrency cap (None = derived from core count)
    pub max_concurrency: Option<usize>,
    pub champion_pool: usize,
    pub item_pool: usize,
    /// Overflow pool size (None = whatever the dedicated pools leave)
    pub general_pool: Option<usize>,
    /// Attempts per file including the first one
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub retry_base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub retry_max_delay: Duration,
    pub backoff_jitter: f64,
    #[serde(with = "humantime_serde")]
    pub task_timeout: Duration,
}

impl Default for SchedulerConfigToml {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            champion_pool: workers::CHAMPION_POOL_SIZE,
            item_pool: workers::ITEM_POOL_SIZE,
            general_pool: None,
            max_attempts: limits::MAX_ATTEMPTS,
            retry_base_delay: limits::RETRY_BASE_DELAY,
            retry_max_delay: limits::RETRY_MAX_DELAY,
            backoff_jitter: limits::BACKOFF_JITTER_FACTOR,
            task_timeout: workers::TASK_TIMEOUT,
        }
    }
}

/// TOML-friendly bootstrap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfigToml {
    /// Enabled categories
    pub categories: Vec<Category>,
    /// Categories synchronized at the same time
    pub max_parallel_categories: usize,
    /// Minimum interval between progress updates
    #[serde(with = "humantime_serde")]
    pub progress_interval: Duration,
}

impl Default for BootstrapConfigToml {
    fn default() -> Self {
        Self {
            categories: Category::ALL.to_vec(),
            max_parallel_categories: workers::MAX_PARALLEL_CATEGORIES,
            progress_interval: progress::UPDATE_INTERVAL,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LEVEL.to_string(),
        }
    }
}

/// Runtime configuration assembled from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub client: ClientConfig,
    pub cache_root: Option<PathBuf>,
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            client: self.catalog.to_runtime_config(),
            cache_root: self.cache.cache_root.clone(),
            bootstrap: BootstrapConfig::default()
                .with_categories(self.bootstrap.categories.clone())
                .with_max_parallel_categories(self.bootstrap.max_parallel_categories)
                .with_progress_interval(self.bootstrap.progress_interval)
                .with_scheduler(
                    self.scheduler
                        .to_runtime_config(self.bootstrap.progress_interval),
                )
                .with_integrity(self.cache.to_runtime_config()),
        }
    }

    /// Validate every section, collecting all problems
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let runtime = self.to_runtime_config();
        let mut errors = Vec::new();

        if let Err(e) = runtime.client.validate() {
            errors.push(format!("catalog: {}", e));
        }
        if let Err(e) = runtime.bootstrap.validate() {
            errors.push(format!("bootstrap: {}", e));
        }
        if !matches!(
            self.logging.level.as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            errors.push(format!("logging: unknown level '{}'", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors })
        }
    }

    /// Load configuration with precedence:
    /// 1. Explicit config file
    /// 2. Config file found in a standard location
    /// 3. Default values
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration file if none exists yet
    pub async fn initialize(path: Option<PathBuf>) -> Result<PathBuf> {
        let config_path = match path {
            Some(path) => path,
            None => Self::get_default_config_path()?,
        };

        if config_path.exists() {
            return Ok(config_path);
        }

        info!("Creating default configuration file...");
        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::generic(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(&config_path, Self::generate_default_config_content())
            .await
            .map_err(|e| {
                AppError::generic(format!(
                    "Failed to write config file {}: {}",
                    config_path.display(),
                    e
                ))
            })?;

        Ok(config_path)
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![
            PathBuf::from("./ddragon-cache.toml"),
            PathBuf::from("./config.toml"),
        ];
        if let Ok(path) = Self::get_default_config_path() {
            search_paths.push(path);
        }

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Some(path);
            }
        }

        debug!("No config file found in standard locations");
        None
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

        Ok(config_dir.join(cache::APP_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# Data Dragon asset cache configuration
# Every setting is optional; missing ones use the defaults shown here.

[catalog]
base_url = "{base_url}"
cdn_url = "{cdn_url}"
locale = "{locale}"
overlay_base_url = "{overlay}"
# Pin a version instead of following the latest one
# pinned_version = "{fallback}"
rate_limit_rps = {rps}
request_timeout = "30s"
connect_timeout = "10s"
version_timeout = "10s"

[cache]
# Cache directory (leave unset to use the platform cache directory)
# cache_root = "/path/to/custom/cache"

# Recorded files older than this are downloaded again
max_age = "30days"

# Compare md5 checksums when verifying
deep_verify = false
integrity_concurrency = 32

[scheduler]
# Global cap on concurrent downloads (unset = min(cores x 8, 100))
# max_concurrency = 64
champion_pool = {champion_pool}
item_pool = {item_pool}
# general_pool = 39
max_attempts = {attempts}
retry_base_delay = "500ms"
retry_max_delay = "10s"
backoff_jitter = 0.1
task_timeout = "15s"

[bootstrap]
categories = ["champion", "item", "spell", "rune", "overlay"]
max_parallel_categories = {parallel}
progress_interval = "100ms"

[logging]
level = "info"  # error, warn, info, debug, trace
"#,
            base_url = ddragon::BASE_URL,
            cdn_url = ddragon::CDN_URL,
            locale = ddragon::DEFAULT_LOCALE,
            overlay = ddragon::DEFAULT_OVERLAY_BASE_URL,
            fallback = ddragon::FALLBACK_VERSION,
            rps = limits::DEFAULT_RATE_LIMIT_RPS,
            champion_pool = workers::CHAMPION_POOL_SIZE,
            item_pool = workers::ITEM_POOL_SIZE,
            attempts = limits::MAX_ATTEMPTS,
            parallel = workers::MAX_PARALLEL_CATEGORIES,
        )
    }
}

impl CatalogConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            cdn_url: self.cdn_url.clone(),
            locale: self.locale.clone(),
            overlay_base_url: self.overlay_base_url.clone(),
            pinned_version: self.pinned_version.clone(),
            version_timeout: self.version_timeout,
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            rate_limit_rps: self.rate_limit_rps,
            ..ClientConfig::default()
        }
    }
}

impl CacheConfigToml {
    /// Convert to runtime IntegrityConfig
    pub fn to_runtime_config(&self) -> IntegrityConfig {
        IntegrityConfig {
            max_age: self.max_age,
            deep: self.deep_verify,
            concurrency: self.integrity_concurrency,
        }
    }
}

impl SchedulerConfigToml {
    /// Convert to runtime SchedulerConfig
    pub fn to_runtime_config(&self, progress_interval: Duration) -> SchedulerConfig {
        let mut dedicated_pools = SchedulerConfig::default_dedicated_pools();
        dedicated_pools.insert(Category::Champion, self.champion_pool);
        dedicated_pools.insert(Category::Item, self.item_pool);
        dedicated_pools.retain(|_, size| *size > 0);

        SchedulerConfig {
            max_concurrency: self
                .max_concurrency
                .unwrap_or_else(SchedulerConfig::default_concurrency),
            dedicated_pools,
            general_pool_size: self.general_pool,
            max_attempts: self.max_attempts,
            retry_base_delay: self.retry_base_delay,
            retry_max_delay: self.retry_max_delay,
            backoff_jitter: self.backoff_jitter,
            task_timeout: self.task_timeout,
            progress_interval,
        }
    }
}
