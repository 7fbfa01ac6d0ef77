//! HTTP client and upstream endpoint configuration
//!
//! Holds connection tuning for the shared `reqwest` client together with the
//! Data Dragon endpoints the catalog and file host talk to.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::{ddragon, http, limits};
use crate::errors::{DownloadError, DownloadResult};

/// Configuration for HTTP access to the upstream catalog and assets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL for the version API
    pub base_url: String,
    /// CDN root for versioned documents and images
    pub cdn_url: String,
    /// Locale of data documents
    pub locale: String,
    /// Base URL overlay images are fetched from
    pub overlay_base_url: String,
    /// Use this version instead of asking upstream for the latest
    pub pinned_version: Option<String>,
    /// Timeout for the version lookup
    pub version_timeout: Duration,
    /// Attempts for catalog document fetches
    pub catalog_max_attempts: u32,
    /// Enable HTTP/2 adaptive window
    pub http2: bool,
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum number of idle connections per host
    pub pool_max_per_host: usize,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: ddragon::BASE_URL.to_string(),
            cdn_url: ddragon::CDN_URL.to_string(),
            locale: ddragon::DEFAULT_LOCALE.to_string(),
            overlay_base_url: ddragon::DEFAULT_OVERLAY_BASE_URL.to_string(),
            pinned_version: None,
            version_timeout: ddragon::VERSION_TIMEOUT,
            catalog_max_attempts: limits::MAX_ATTEMPTS,
            http2: true,
            tcp_keepalive: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

impl ClientConfig {
    /// Pin the catalog version
    pub fn with_pinned_version(mut self, version: impl Into<String>) -> Self {
        self.pinned_version = Some(version.into());
        self
    }

    /// Override the overlay image source
    pub fn with_overlay_base_url(mut self, url: impl Into<String>) -> Self {
        self.overlay_base_url = url.into();
        self
    }

    /// Full URL of the version list
    pub fn versions_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            ddragon::VERSIONS_PATH
        )
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("base_url", &self.base_url),
            ("cdn_url", &self.cdn_url),
            ("overlay_base_url", &self.overlay_base_url),
        ] {
            url::Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", name, e))?;
        }

        if self.locale.is_empty() {
            return Err("Locale cannot be empty".to_string());
        }

        if self.rate_limit_rps == 0 {
            return Err("Rate limit must be greater than 0".to_string());
        }

        if self.catalog_max_attempts == 0 {
            return Err("Catalog attempts must be greater than 0".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout cannot be zero".to_string());
        }

        Ok(())
    }

    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> DownloadResult<Client> {
        let mut client_builder = Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(http::MAX_REDIRECTS))
            .tcp_nodelay(self.tcp_nodelay)
            .pool_max_idle_per_host(self.pool_max_per_host);

        if self.http2 {
            client_builder = client_builder.http2_adaptive_window(true);
        }

        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(DownloadError::Http)
    }
}
