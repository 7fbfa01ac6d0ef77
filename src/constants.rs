//! Application constants for the Data Dragon asset cache
//!
//! Centralizes upstream endpoints, scheduler defaults and file naming,
//! organized by functional domain.

use std::time::Duration;

/// Upstream Data Dragon endpoints
pub mod ddragon {
    use super::Duration;

    /// Base URL hosting the API and CDN
    pub const BASE_URL: &str = "https://ddragon.leagueoflegends.com";

    /// CDN root for versioned data and images
    pub const CDN_URL: &str = "https://ddragon.leagueoflegends.com/cdn";

    /// Path of the version list below [`BASE_URL`]
    pub const VERSIONS_PATH: &str = "/api/versions.json";

    /// Locale used for data documents
    pub const DEFAULT_LOCALE: &str = "en_US";

    /// Version used when the version list cannot be fetched
    pub const FALLBACK_VERSION: &str = "15.16.1";

    /// Timeout for the version lookup
    pub const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

    /// Where overlay images are served from by default
    pub const DEFAULT_OVERLAY_BASE_URL: &str = "http://localhost:3000/assets/overlay";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "ddragon-cache/0.1.0";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 100;

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// Rate limiting and retry configuration
pub mod limits {
    use super::Duration;

    /// Default request rate against the CDN (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 50;

    /// Attempts inside the HTTP handler for 429/503 responses
    pub const HTTP_MAX_RETRIES: u32 = 3;

    /// Default number of attempts per task (first try plus retries)
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff
    pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

    /// Maximum backoff delay
    pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

    /// Jitter factor for randomizing delays (0.0-1.0)
    pub const BACKOFF_JITTER_FACTOR: f64 = 0.1;
}

/// Worker and concurrency configuration
pub mod workers {
    use super::Duration;

    /// Workers per available core
    pub const CORE_MULTIPLIER: usize = 8;

    /// Upper bound on the global concurrency cap
    pub const MAX_CONCURRENCY: usize = 100;

    /// Dedicated slots for champion tasks
    pub const CHAMPION_POOL_SIZE: usize = 15;

    /// Dedicated slots for item tasks
    pub const ITEM_POOL_SIZE: usize = 10;

    /// Per-attempt timeout for a single task
    pub const TASK_TIMEOUT: Duration = Duration::from_secs(15);

    /// Categories processed at the same time by the bootstrapper
    pub const MAX_PARALLEL_CATEGORIES: usize = 5;
}

/// Progress reporting
pub mod progress {
    use super::Duration;

    /// Minimum interval between throttled progress emissions
    pub const UPDATE_INTERVAL: Duration = Duration::from_millis(100);
}

/// Cache layout and integrity constants
pub mod cache {
    use super::Duration;

    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Suffix appended to the category name for manifest files
    pub const MANIFEST_SUFFIX: &str = "-manifest.json";

    /// Application directory name under the platform config directory
    pub const APP_DIR_NAME: &str = "ddragon-cache";

    /// Default maximum age of a recorded asset before it is considered stale
    pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);
}

/// Size estimates used for queue ordering, in bytes
pub mod sizes {
    /// Structured data record
    pub const DATA: u64 = 5_000;

    /// Ability icon
    pub const ABILITY: u64 = 30_000;

    /// Square or item icon
    pub const ICON: u64 = 50_000;

    /// Broadcast overlay image
    pub const OVERLAY: u64 = 100_000;

    /// Loading screen art
    pub const LOADING: u64 = 150_000;

    /// Splash art
    pub const SPLASH: u64 = 200_000;
}

/// Logging and debugging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LEVEL: &str = "info";

    /// Crate target used in filter directives
    pub const TARGET: &str = "ddragon_cache";
}
