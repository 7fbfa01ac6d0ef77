//! Command-line argument parsing for the asset cache
//!
//! This module defines the CLI structure using clap derive macros: a sync
//! command that fills the cache, read-only verify and status commands, cache
//! clearing and configuration file management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::Category;

/// ddragon-cache - Keep a local copy of Data Dragon assets
#[derive(Parser, Debug)]
#[command(
    name = "ddragon-cache",
    version,
    about = "Download and verify a local cache of Data Dragon assets",
    long_about = "Synchronizes champion, item, rune, summoner spell and overlay assets into a local cache.
Only missing or corrupted files are downloaded; interrupted runs resume where they stopped."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download missing and corrupted assets
    Sync(SyncArgs),

    /// Check cached files without downloading anything
    Verify(VerifyArgs),

    /// Show how complete each category is
    Status(StatusArgs),

    /// Remove cached files and manifests
    Clear(ClearArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the sync command
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Only synchronize these categories (repeatable)
    #[arg(short, long = "category", value_name = "CATEGORY")]
    pub categories: Vec<Category>,

    /// Use this version instead of the latest one
    #[arg(long = "version-pin", value_name = "VERSION")]
    pub version: Option<String>,

    /// Global cap on concurrent downloads
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the verify command
#[derive(Args, Debug, Clone, Default)]
pub struct VerifyArgs {
    /// Also compare md5 checksums of recorded files
    #[arg(long)]
    pub deep: bool,

    /// Only verify these categories (repeatable)
    #[arg(short, long = "category", value_name = "CATEGORY")]
    pub categories: Vec<Category>,

    /// List every problem instead of a per-category summary
    #[arg(long)]
    pub detailed: bool,
}

/// Arguments for the status command
#[derive(Args, Debug, Clone, Default)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the clear command
#[derive(Args, Debug, Clone, Default)]
pub struct ClearArgs {
    /// Only clear this category
    #[arg(short, long, value_name = "CATEGORY")]
    pub category: Option<Category>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for configuration management
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Write a default configuration file if none exists
    #[arg(long)]
    pub init: bool,

    /// Print the effective configuration
    #[arg(long)]
    pub show: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl SyncArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == Some(0) {
            return Err("Concurrency must be greater than 0".to_string());
        }
        if matches!(self.version.as_deref(), Some(v) if v.trim().is_empty()) {
            return Err("Pinned version cannot be empty".to_string());
        }
        Ok(())
    }
}
