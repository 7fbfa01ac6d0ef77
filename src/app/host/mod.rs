//! Host capabilities consumed by the pipeline
//!
//! The core never touches the filesystem or the network directly. Everything
//! goes through two narrow traits injected once at construction:
//!
//! - [`AssetHost`] - stat, fetch-and-write and removal of cached assets
//! - [`ManifestStorage`] - persistence of per-category manifest blobs
//!
//! [`FsHost`] implements both on top of a local cache directory and the shared
//! rate-limited HTTP handler. [`NullHost`] stands in when no host is attached:
//! every asset reads as missing and every write fails without retrying.
//!
//! Asset keys are versioned relative paths such as
//! `15.16.1/champions/Ahri/square.png`.

pub mod fs;
pub mod null;
pub mod types;

use async_trait::async_trait;

use crate::app::models::{AssetVersion, Category};
use crate::errors::HostResult;

pub use fs::FsHost;
pub use null::NullHost;
pub use types::{FileStat, WrittenAsset};

/// Filesystem and network primitives for cached assets
#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Stat the file stored under `key`
    async fn file_exists(&self, key: &str) -> HostResult<FileStat>;

    /// Size in bytes of the file stored under `key`
    async fn file_size(&self, key: &str) -> HostResult<u64>;

    /// Read the file stored under `key`
    async fn read_asset(&self, key: &str) -> HostResult<Vec<u8>>;

    /// Fetch `url` and store the body under `key`
    async fn write_asset(&self, url: &str, category: Category, key: &str)
        -> HostResult<WrittenAsset>;

    /// Store already available bytes under `key`
    async fn write_bytes(
        &self,
        category: Category,
        key: &str,
        bytes: &[u8],
    ) -> HostResult<WrittenAsset>;

    /// Remove cached files of one category across all versions, or everything
    ///
    /// Returns the number of removed entries.
    async fn remove_assets(&self, category: Option<Category>) -> HostResult<usize>;
}

/// Persistence primitive for manifest blobs
#[async_trait]
pub trait ManifestStorage: Send + Sync {
    /// Load the stored blob, `None` when nothing was saved yet
    async fn load_manifest(
        &self,
        category: Category,
        version: &AssetVersion,
    ) -> HostResult<Option<Vec<u8>>>;

    /// Replace the stored blob atomically
    async fn save_manifest(
        &self,
        category: Category,
        version: &AssetVersion,
        blob: &[u8],
    ) -> HostResult<()>;

    /// Remove manifests of one category across all versions, or all of them
    async fn remove_manifests(&self, category: Option<Category>) -> HostResult<usize>;
}

/// Compute the hex md5 digest recorded for written assets
pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}
