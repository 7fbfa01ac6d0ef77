//! Local filesystem host
//!
//! Stores assets below a cache root using the temp file + rename pattern so a
//! crash never leaves a truncated file under a final name. Remote assets are
//! fetched through the shared [`HttpHandler`].

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, error, info};

use super::types::{FileStat, WrittenAsset};
use super::{checksum, AssetHost, ManifestStorage};
use crate::app::client::http::HttpHandler;
use crate::app::models::{AssetVersion, Category};
use crate::constants::cache;
use crate::errors::{FilesystemError, HostError, HostResult};

/// Filesystem-backed implementation of both host traits
#[derive(Debug, Clone)]
pub struct FsHost {
    root: PathBuf,
    http: Arc<HttpHandler>,
}

impl FsHost {
    /// Create a host rooted at `root`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns `HostError::Filesystem` if the root cannot be created
    pub async fn new(root: PathBuf, http: Arc<HttpHandler>) -> HostResult<Self> {
        ensure_directory_exists(&root).await?;
        info!("Initialized asset cache at {}", root.display());
        Ok(Self { root, http })
    }

    /// Get the default cache directory for the current OS
    ///
    /// - macOS: ~/Library/Application Support/ddragon-cache/cache
    /// - Linux: ~/.config/ddragon-cache/cache
    /// - Windows: %APPDATA%/ddragon-cache/cache
    pub fn default_cache_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(cache::APP_DIR_NAME).join("cache"))
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative key below the root, rejecting escapes
    pub fn resolve(&self, key: &str) -> HostResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(FilesystemError::InvalidKey {
                key: key.to_string(),
            }
            .into());
        }
        Ok(self.root.join(relative))
    }

    fn manifest_path(&self, category: Category, version: &AssetVersion) -> HostResult<PathBuf> {
        self.resolve(&format!(
            "{}/{}{}",
            version,
            category.as_str(),
            cache::MANIFEST_SUFFIX
        ))
    }

    /// Write `content` to `path` atomically
    async fn save_atomic(&self, path: &Path, content: &[u8]) -> HostResult<()> {
        let temp_path = temp_path_for(path);

        if let Some(parent) = path.parent() {
            ensure_directory_exists(parent).await?;
        }

        fs::write(&temp_path, content).await.map_err(|e| {
            error!("Failed to write temporary file {}: {}", temp_path.display(), e);
            FilesystemError::TempFile {
                path: temp_path.clone(),
            }
        })?;

        if let Err(e) = fs::rename(&temp_path, path).await {
            error!("Failed to rename temporary file: {}", e);
            let _ = fs::remove_file(&temp_path).await;
            return Err(FilesystemError::AtomicRename {
                temp_path,
                final_path: path.to_path_buf(),
            }
            .into());
        }

        Ok(())
    }

    async fn store(&self, key: &str, content: &[u8]) -> HostResult<WrittenAsset> {
        let path = self.resolve(key)?;
        self.save_atomic(&path, content).await?;
        debug!("Stored {} ({} bytes)", key, content.len());
        Ok(WrittenAsset {
            local_path: path,
            size: content.len() as u64,
            checksum: checksum(content),
        })
    }

    /// Version directories currently present under the root
    async fn version_dirs(&self) -> HostResult<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(dirs),
            Err(e) => return Err(FilesystemError::io(&self.root, e).into()),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FilesystemError::io(&self.root, e))?
        {
            let path = entry.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        Ok(dirs)
    }
}

#[async_trait]
impl AssetHost for FsHost {
    async fn file_exists(&self, key: &str) -> HostResult<FileStat> {
        let path = self.resolve(key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(FileStat::present(meta.len())),
            Ok(_) => Ok(FileStat::missing()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileStat::missing()),
            Err(e) => Err(FilesystemError::io(path, e).into()),
        }
    }

    async fn file_size(&self, key: &str) -> HostResult<u64> {
        let path = self.resolve(key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| FilesystemError::io(&path, e))?;
        Ok(meta.len())
    }

    async fn read_asset(&self, key: &str) -> HostResult<Vec<u8>> {
        let path = self.resolve(key)?;
        fs::read(&path)
            .await
            .map_err(|e| FilesystemError::io(path, e).into())
    }

    async fn write_asset(
        &self,
        url: &str,
        category: Category,
        key: &str,
    ) -> HostResult<WrittenAsset> {
        // Validate before spending a request on it
        self.resolve(key)?;
        let bytes = self.http.get_bytes(url).await.map_err(HostError::Network)?;
        debug!("Fetched {} asset from {}", category, url);
        self.store(key, &bytes).await
    }

    async fn write_bytes(
        &self,
        _category: Category,
        key: &str,
        bytes: &[u8],
    ) -> HostResult<WrittenAsset> {
        self.store(key, bytes).await
    }

    async fn remove_assets(&self, category: Option<Category>) -> HostResult<usize> {
        let mut removed = 0;
        for version_dir in self.version_dirs().await? {
            let target = match category {
                Some(category) => version_dir.join(category.dir_name()),
                None => version_dir,
            };
            if target.is_dir() {
                fs::remove_dir_all(&target)
                    .await
                    .map_err(|e| FilesystemError::io(&target, e))?;
                removed += 1;
            }
        }
        info!("Removed {} cached asset directories", removed);
        Ok(removed)
    }
}

#[async_trait]
impl ManifestStorage for FsHost {
    async fn load_manifest(
        &self,
        category: Category,
        version: &AssetVersion,
    ) -> HostResult<Option<Vec<u8>>> {
        let path = self.manifest_path(category, version)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FilesystemError::io(path, e).into()),
        }
    }

    async fn save_manifest(
        &self,
        category: Category,
        version: &AssetVersion,
        blob: &[u8],
    ) -> HostResult<()> {
        let path = self.manifest_path(category, version)?;
        self.save_atomic(&path, blob).await
    }

    async fn remove_manifests(&self, category: Option<Category>) -> HostResult<usize> {
        let mut removed = 0;
        for version_dir in self.version_dirs().await? {
            let mut entries = fs::read_dir(&version_dir)
                .await
                .map_err(|e| FilesystemError::io(&version_dir, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| FilesystemError::io(&version_dir, e))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                let matches = match category {
                    Some(category) => {
                        name == format!("{}{}", category.as_str(), cache::MANIFEST_SUFFIX)
                    }
                    None => name.ends_with(cache::MANIFEST_SUFFIX),
                };
                if matches {
                    let path = entry.path();
                    fs::remove_file(&path)
                        .await
                        .map_err(|e| FilesystemError::io(&path, e))?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(cache::TEMP_FILE_SUFFIX);
    path.with_file_name(name)
}

/// Ensure a directory exists, creating it if necessary
async fn ensure_directory_exists(path: &Path) -> HostResult<()> {
    fs::create_dir_all(path).await.map_err(|e| {
        error!("Failed to create directory {}: {}", path.display(), e);
        HostError::Filesystem(FilesystemError::io(path, e))
    })
}
