//! Command-line interface components
//!
//! This module contains CLI-specific code for the asset cache, including
//! argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    ClearArgs, Cli, Commands, ConfigArgs, GlobalArgs, StatusArgs, SyncArgs, VerifyArgs,
};
pub use commands::{handle_clear, handle_config, handle_status, handle_sync, handle_verify};
pub use progress::{ProgressConfig, ProgressDisplay};
