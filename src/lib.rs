//! ddragon-cache library
//!
//! Keeps a local, versioned cache of Data Dragon assets. Catalogs are diffed
//! against per-category manifests and on-disk files, and only missing or
//! corrupted files are downloaded through a bounded, retrying scheduler.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
