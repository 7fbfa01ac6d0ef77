//! Value types returned by host capabilities

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result of a stat call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileStat {
    pub exists: bool,
    pub size: Option<u64>,
}

impl FileStat {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn present(size: u64) -> Self {
        Self {
            exists: true,
            size: Some(size),
        }
    }
}

/// A file successfully stored by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenAsset {
    /// Where the host put the file
    pub local_path: PathBuf,
    /// Bytes written
    pub size: u64,
    /// Hex md5 of the content
    pub checksum: String,
}
