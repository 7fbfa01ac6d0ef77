//! Scheduler configuration management
//!
//! Provides configuration structures and validation for the worker scheduler,
//! with defaults derived from the host's core count and presets for different
//! deployment scenarios.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;
use crate::app::models::Category;
use crate::constants::{limits, progress, workers};

/// Configuration for the worker scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Global cap on in-flight tasks across every category
    pub max_concurrency: usize,
    /// Slots reserved for individual categories
    pub dedicated_pools: BTreeMap<Category, usize>,
    /// Overflow slots; `None` derives `max(1, cap - sum(dedicated))`
    pub general_pool_size: Option<usize>,
    /// Attempts per task including the first one
    pub max_attempts: u32,
    /// Base delay between retries (exponential backoff)
    pub retry_base_delay: Duration,
    /// Maximum retry delay (backoff cap)
    pub retry_max_delay: Duration,
    /// Jitter fraction for backoff randomization
    pub backoff_jitter: f64,
    /// Timeout for one attempt of one task
    pub task_timeout: Duration,
    /// Minimum interval between throttled progress callbacks
    pub progress_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: Self::default_concurrency(),
            dedicated_pools: Self::default_dedicated_pools(),
            general_pool_size: None,
            max_attempts: limits::MAX_ATTEMPTS,
            retry_base_delay: limits::RETRY_BASE_DELAY,
            retry_max_delay: limits::RETRY_MAX_DELAY,
            backoff_jitter: limits::BACKOFF_JITTER_FACTOR,
            task_timeout: workers::TASK_TIMEOUT,
            progress_interval: progress::UPDATE_INTERVAL,
        }
    }
}

impl SchedulerConfig {
    /// `min(cores × multiplier, upper bound)`
    pub fn default_concurrency() -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (cores * workers::CORE_MULTIPLIER).min(workers::MAX_CONCURRENCY)
    }

    /// Champion and item pools
    pub fn default_dedicated_pools() -> BTreeMap<Category, usize> {
        BTreeMap::from([
            (Category::Champion, workers::CHAMPION_POOL_SIZE),
            (Category::Item, workers::ITEM_POOL_SIZE),
        ])
    }

    /// Effective size of the general pool
    pub fn general_pool(&self) -> usize {
        self.general_pool_size.unwrap_or_else(|| {
            let dedicated: usize = self.dedicated_pools.values().sum();
            self.max_concurrency.saturating_sub(dedicated).max(1)
        })
    }

    /// Retry policy applied to every task
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.retry_base_delay,
            max_delay: self.retry_max_delay,
            multiplier: 2,
            jitter: self.backoff_jitter,
        }
    }

    /// Validate configuration values and return errors for invalid settings
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("Maximum concurrency cannot be zero".to_string());
        }

        if self.max_concurrency > workers::MAX_CONCURRENCY {
            return Err(format!(
                "Maximum concurrency ({}) exceeds upper bound ({})",
                self.max_concurrency,
                workers::MAX_CONCURRENCY
            ));
        }

        if let Some((category, _)) = self.dedicated_pools.iter().find(|(_, size)| **size == 0) {
            return Err(format!("Dedicated pool for {} cannot be empty", category));
        }

        if self.general_pool_size == Some(0) {
            return Err("General pool cannot be empty".to_string());
        }

        if self.max_attempts == 0 {
            return Err("Maximum attempts must be at least 1".to_string());
        }

        if self.retry_base_delay > self.retry_max_delay {
            return Err("Retry base delay must not exceed max delay".to_string());
        }

        if !(0.0..=1.0).contains(&self.backoff_jitter) {
            return Err("Backoff jitter must be between 0.0 and 1.0".to_string());
        }

        if self.task_timeout.is_zero() {
            return Err("Task timeout cannot be zero".to_string());
        }

        Ok(())
    }
}

/// Builder for SchedulerConfig
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    /// Set the global concurrency cap
    pub fn max_concurrency(mut self, cap: usize) -> Self {
        self.config.max_concurrency = cap;
        self
    }

    /// Reserve `size` slots for `category`
    pub fn dedicated_pool(mut self, category: Category, size: usize) -> Self {
        self.config.dedicated_pools.insert(category, size);
        self
    }

    /// Set the general pool size explicitly
    pub fn general_pool_size(mut self, size: usize) -> Self {
        self.config.general_pool_size = Some(size);
        self
    }

    /// Set attempts per task
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set retry base delay
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry_base_delay = delay;
        self
    }

    /// Set retry max delay
    pub fn retry_max_delay(mut self, delay: Duration) -> Self {
        self.config.retry_max_delay = delay;
        self
    }

    /// Set per-attempt timeout
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.config.task_timeout = timeout;
        self
    }

    /// Set the progress throttle interval
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.config.progress_interval = interval;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<SchedulerConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build without validation (for testing)
    pub fn build_unchecked(self) -> SchedulerConfig {
        self.config
    }
}

/// Configuration presets for different deployment scenarios
pub struct ConfigPresets;

impl ConfigPresets {
    /// Production configuration using the derived defaults
    pub fn production() -> SchedulerConfig {
        SchedulerConfig::default()
    }

    /// Development configuration with a small cap and shorter waits
    pub fn development() -> SchedulerConfig {
        SchedulerConfig {
            max_concurrency: 8,
            dedicated_pools: BTreeMap::from([(Category::Champion, 4), (Category::Item, 2)]),
            max_attempts: 2,
            retry_base_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_secs(2),
            task_timeout: Duration::from_secs(10),
            ..Default::default()
        }
    }

    /// Testing configuration with no waits and no jitter
    pub fn testing() -> SchedulerConfig {
        SchedulerConfig {
            max_concurrency: 4,
            dedicated_pools: BTreeMap::from([(Category::Champion, 2), (Category::Item, 1)]),
            general_pool_size: None,
            max_attempts: 2,
            retry_base_delay: Duration::ZERO,
            retry_max_delay: Duration::ZERO,
            backoff_jitter: 0.0,
            task_timeout: Duration::from_secs(5),
            progress_interval: Duration::ZERO,
        }
    }
}
