//! Error types for the Data Dragon asset cache
//!
//! Each subsystem owns a `thiserror` enum. The pipeline is built so that only
//! structural failures (a category whose catalog cannot be fetched, a broken
//! configuration) surface as errors from the public API; per-asset failures
//! are collected into reports instead of being propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Filesystem failures raised by a host while reading or writing the cache
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Generic I/O failure
    #[error("File I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Temporary file could not be created or written
    #[error("Temporary file operation failed: {path}")]
    TempFile { path: PathBuf },

    /// Atomic rename of a finished temp file failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicRename {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Relative key escapes the cache root or is otherwise unusable
    #[error("Invalid cache key: {key}")]
    InvalidKey { key: String },
}

impl FilesystemError {
    /// Wrap an `std::io::Error` with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Network failures for a single fetch
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request exceeded its deadline
    #[error("Download timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Resource does not exist upstream
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    /// Server returned an error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Maximum retries exceeded inside the HTTP handler
    #[error("Maximum retry attempts ({max_retries}) exceeded for download")]
    MaxRetriesExceeded { max_retries: u32 },
}

impl DownloadError {
    /// Whether retrying the same request can plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::Http(e) => !e.is_builder() && !e.is_redirect(),
            DownloadError::Timeout { .. }
            | DownloadError::RateLimitExceeded
            | DownloadError::ServerOverloaded
            | DownloadError::MaxRetriesExceeded { .. } => true,
            DownloadError::ServerError { status } => *status >= 500,
            DownloadError::InvalidUrl { .. } | DownloadError::NotFound { .. } => false,
        }
    }
}

/// Errors returned by the injected host capabilities
#[derive(Error, Debug)]
pub enum HostError {
    /// Fetching the asset failed
    #[error(transparent)]
    Network(#[from] DownloadError),

    /// Writing or inspecting the asset failed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// No host is attached to this pipeline
    #[error("No host is available for {operation}")]
    Unavailable { operation: &'static str },
}

impl HostError {
    /// Whether the operation is worth retrying within the same run
    pub fn is_transient(&self) -> bool {
        match self {
            HostError::Network(e) => e.is_transient(),
            // Locked or busy files often clear after a short wait
            HostError::Filesystem(FilesystemError::InvalidKey { .. }) => false,
            HostError::Filesystem(_) => true,
            HostError::Unavailable { .. } => false,
        }
    }
}

/// Catalog enumeration failures; fatal for the affected category only
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The upstream request failed
    #[error("Catalog request for {category} failed: {source}")]
    Fetch {
        category: String,
        #[source]
        source: DownloadError,
    },

    /// The upstream document could not be parsed
    #[error("Catalog document for {category} is malformed: {reason}")]
    Malformed { category: String, reason: String },

    /// Version list was empty or unusable
    #[error("No asset version available: {reason}")]
    NoVersion { reason: String },
}

impl CatalogError {
    /// Create a malformed-document error
    pub fn malformed(category: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            category: category.into(),
            reason: reason.to_string(),
        }
    }
}

/// Manifest persistence errors
///
/// Corruption never escapes [`crate::app::ManifestStore::load`]; it is logged
/// and replaced with an empty manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Stored blob could not be decoded
    #[error("Manifest corruption detected for {name}: {reason}")]
    Corruption { name: String, reason: String },

    /// Manifest could not be encoded
    #[error("Manifest serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Storage host failed
    #[error("Manifest storage failed: {0}")]
    Storage(#[from] HostError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<String> },
}

/// Errors raised by the top-level bootstrapper
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// `start` was called while another run is active
    #[error("A synchronization run is already in progress")]
    AlreadyRunning,

    /// Invalid runtime configuration
    #[error("Invalid bootstrap configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Cache clearing failed
    #[error("Failed to clear cache: {0}")]
    ClearFailed(#[source] HostError),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Host capability error
    #[error(transparent)]
    Host(#[from] HostError),

    /// Catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bootstrap error
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Host(e) => e.is_transient(),
            AppError::Catalog(CatalogError::Fetch { source, .. }) => source.is_transient(),
            AppError::Manifest(ManifestError::Corruption { .. }) => true,
            AppError::Manifest(ManifestError::Storage(e)) => e.is_transient(),
            AppError::Bootstrap(BootstrapError::AlreadyRunning) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Host(HostError::Network(_)) => "network",
            AppError::Host(HostError::Filesystem(_)) => "filesystem",
            AppError::Host(HostError::Unavailable { .. }) => "host",
            AppError::Catalog(_) => "catalog",
            AppError::Manifest(_) => "manifest",
            AppError::Config(_) => "config",
            AppError::Bootstrap(_) => "bootstrap",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Host result type alias
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Catalog result type alias
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Bootstrap result type alias
pub type BootstrapResult<T> = std::result::Result<T, BootstrapError>;
