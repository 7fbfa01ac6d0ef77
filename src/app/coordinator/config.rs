//! Configuration structures for the bootstrapper
//!
//! Defines which categories a run covers, how many of them run at once and
//! the scheduler and integrity settings handed to every category.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::integrity::IntegrityConfig;
use crate::app::models::Category;
use crate::app::worker::SchedulerConfig;
use crate::constants::{progress, workers};

/// Configuration for the bootstrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Categories synchronized by a run, in priority order
    pub categories: Vec<Category>,
    /// Categories processed at the same time
    pub max_parallel_categories: usize,
    /// Minimum interval between throttled overall snapshots
    pub progress_interval: Duration,
    /// Worker scheduler configuration shared by every category
    pub scheduler: SchedulerConfig,
    /// Integrity rules
    pub integrity: IntegrityConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            categories: Category::ALL.to_vec(),
            max_parallel_categories: workers::MAX_PARALLEL_CATEGORIES,
            progress_interval: progress::UPDATE_INTERVAL,
            scheduler: SchedulerConfig::default(),
            integrity: IntegrityConfig::default(),
        }
    }
}

impl BootstrapConfig {
    /// Restrict the run to `categories`
    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    /// Set how many categories run at once
    pub fn with_max_parallel_categories(mut self, count: usize) -> Self {
        self.max_parallel_categories = count;
        self
    }

    /// Set progress update interval
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_integrity(mut self, integrity: IntegrityConfig) -> Self {
        self.integrity = integrity;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.categories.is_empty() {
            return Err("At least one category must be enabled".to_string());
        }

        if self.max_parallel_categories == 0 {
            return Err("Parallel category count cannot be zero".to_string());
        }

        self.scheduler.validate()?;
        self.integrity.validate()?;
        Ok(())
    }

    /// Categories sorted by priority with duplicates removed
    pub fn ordered_categories(&self) -> Vec<Category> {
        let mut categories = self.categories.clone();
        categories.sort_by_key(|c| (c.priority(), *c));
        categories.dedup();
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that default configuration is valid
    ///
    /// Ensures the default covers every category with five in parallel.
    #[test]
    fn test_default_config_is_valid() {
        let config = BootstrapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.categories.len(), 5);
        assert_eq!(config.max_parallel_categories, 5);
    }

    /// Test configuration validation
    #[test]
    fn test_config_validation() {
        assert!(BootstrapConfig::default()
            .with_categories(Vec::new())
            .validate()
            .is_err());
        assert!(BootstrapConfig::default()
            .with_max_parallel_categories(0)
            .validate()
            .is_err());

        let mut config = BootstrapConfig::default();
        config.scheduler.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ordered_categories() {
        let config = BootstrapConfig::default().with_categories(vec![
            Category::Overlay,
            Category::Rune,
            Category::Champion,
            Category::Rune,
        ]);
        assert_eq!(
            config.ordered_categories(),
            vec![Category::Champion, Category::Rune, Category::Overlay]
        );
    }
}
