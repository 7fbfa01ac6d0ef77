//! Host used when nothing is attached
//!
//! Every asset reads as missing, writes fail with a non-retryable
//! [`HostError::Unavailable`], manifests load as empty and saves are dropped.

use async_trait::async_trait;

use super::types::{FileStat, WrittenAsset};
use super::{AssetHost, ManifestStorage};
use crate::app::models::{AssetVersion, Category};
use crate::errors::{HostError, HostResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

#[async_trait]
impl AssetHost for NullHost {
    async fn file_exists(&self, _key: &str) -> HostResult<FileStat> {
        Ok(FileStat::missing())
    }

    async fn file_size(&self, _key: &str) -> HostResult<u64> {
        Err(HostError::Unavailable {
            operation: "file_size",
        })
    }

    async fn read_asset(&self, _key: &str) -> HostResult<Vec<u8>> {
        Err(HostError::Unavailable {
            operation: "read_asset",
        })
    }

    async fn write_asset(
        &self,
        _url: &str,
        _category: Category,
        _key: &str,
    ) -> HostResult<WrittenAsset> {
        Err(HostError::Unavailable {
            operation: "write_asset",
        })
    }

    async fn write_bytes(
        &self,
        _category: Category,
        _key: &str,
        _bytes: &[u8],
    ) -> HostResult<WrittenAsset> {
        Err(HostError::Unavailable {
            operation: "write_bytes",
        })
    }

    async fn remove_assets(&self, _category: Option<Category>) -> HostResult<usize> {
        Ok(0)
    }
}

#[async_trait]
impl ManifestStorage for NullHost {
    async fn load_manifest(
        &self,
        _category: Category,
        _version: &AssetVersion,
    ) -> HostResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn save_manifest(
        &self,
        _category: Category,
        _version: &AssetVersion,
        _blob: &[u8],
    ) -> HostResult<()> {
        Ok(())
    }

    async fn remove_manifests(&self, _category: Option<Category>) -> HostResult<usize> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_host_reports_missing_and_refuses_writes() {
        let host = NullHost;
        assert!(!host.file_exists("15.16.1/items/1/icon.png").await.unwrap().exists);

        let err = host
            .write_asset("https://example.com/a.png", Category::Item, "a.png")
            .await
            .unwrap_err();
        assert!(!err.is_transient());

        let version = AssetVersion::new("15.16.1");
        assert!(host
            .load_manifest(Category::Item, &version)
            .await
            .unwrap()
            .is_none());
        host.save_manifest(Category::Item, &version, b"{}")
            .await
            .unwrap();
    }
}
