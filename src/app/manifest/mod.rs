//! Per-category manifests of confirmed downloads
//!
//! The filesystem is the source of truth; a manifest only remembers which
//! items were confirmed good so later runs can skip them. Each manifest is
//! keyed by `(category, version)` and is never reused across versions.

pub mod store;
pub mod types;

pub use store::ManifestStore;
pub use types::{AssetRecord, CategoryManifest, ItemCompletion};
