//! Core HTTP operations with rate limiting and throttling backoff
//!
//! One [`HttpHandler`] is shared by the catalog client and the filesystem
//! host so that every request against the CDN goes through the same
//! `governor` quota.

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::app::worker::retry::{retry_with_backoff, RetryPolicy, Retryable};
use crate::constants::limits;
use crate::errors::{DownloadError, DownloadResult};

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
    throttle_policy: RetryPolicy,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidUrl` style configuration errors if the
    /// rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> DownloadResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            throttle_policy: RetryPolicy {
                max_attempts: limits::HTTP_MAX_RETRIES + 1,
                base_delay: Duration::from_secs(1),
                ..Default::default()
            },
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> DownloadResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| DownloadError::InvalidUrl {
            url: "<rate limiter>".to_string(),
            error: "rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// Fetches a successful response, backing off on 429 and 503
    ///
    /// Other non-success statuses are mapped to [`DownloadError`] without
    /// retrying here; callers decide whether to retry those.
    pub async fn get_response(&self, url: &Url) -> DownloadResult<reqwest::Response> {
        let label = format!("GET {}", url);
        retry_with_backoff(&self.throttle_policy, &label, |_| async {
            self.send_once(url).await.map_err(Throttled)
        })
        .await
        .map_err(|failure| failure.error.0)
    }

    async fn send_once(&self, url: &Url) -> DownloadResult<reqwest::Response> {
        // Jitter avoids a thundering herd when many workers wake together
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let response = self.client.get(url.as_str()).send().await?;

        match response.status() {
            status if status.is_success() => {
                tracing::debug!("Fetched {}", url);
                Ok(response)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(DownloadError::RateLimitExceeded),
            StatusCode::SERVICE_UNAVAILABLE => Err(DownloadError::ServerOverloaded),
            StatusCode::NOT_FOUND => Err(DownloadError::NotFound {
                url: url.to_string(),
            }),
            status => Err(DownloadError::ServerError {
                status: status.as_u16(),
            }),
        }
    }

    /// Download the body of `url` into memory
    pub async fn get_bytes(&self, url: &str) -> DownloadResult<Vec<u8>> {
        let parsed = parse_url(url)?;
        let response = self.get_response(&parsed).await?;
        let bytes = response.bytes().await.map_err(DownloadError::Http)?;
        Ok(bytes.to_vec())
    }

    /// Download and decode a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> DownloadResult<T> {
        let parsed = parse_url(url)?;
        let response = self.get_response(&parsed).await?;
        response.json::<T>().await.map_err(DownloadError::Http)
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Only server throttling is retried inside the handler; everything else is
/// left to the caller's own retry policy.
struct Throttled(DownloadError);

impl Retryable for Throttled {
    fn is_retryable(&self) -> bool {
        matches!(
            self.0,
            DownloadError::RateLimitExceeded | DownloadError::ServerOverloaded
        )
    }
}

impl fmt::Display for Throttled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Parse a URL, mapping failures to [`DownloadError::InvalidUrl`]
pub fn parse_url(url: &str) -> DownloadResult<Url> {
    Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
        url: url.to_string(),
        error: e.to_string(),
    })
}
