//! Shared retry-with-backoff helper
//!
//! Every retrying caller in the crate goes through [`retry_with_backoff`] or
//! [`retry_with_backoff_while`]: the worker scheduler for asset tasks, the
//! catalog client for category documents and the HTTP handler for throttled
//! responses. The delay after the n-th failed attempt is
//! `base_delay × 2^(n-1)`, capped at `max_delay`, with optional jitter.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::constants::limits;
use crate::errors::{CatalogError, DownloadError, HostError};

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for DownloadError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

impl Retryable for HostError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

impl Retryable for CatalogError {
    fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Fetch { source, .. } => source.is_transient(),
            CatalogError::Malformed { .. } | CatalogError::NoVersion { .. } => false,
        }
    }
}

/// Attempt budget and backoff shape
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failure
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Exponential multiplier between consecutive delays
    pub multiplier: u32,
    /// Jitter as a fraction of the delay (0.0-1.0)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: limits::MAX_ATTEMPTS,
            base_delay: limits::RETRY_BASE_DELAY,
            max_delay: limits::RETRY_MAX_DELAY,
            multiplier: 2,
            jitter: limits::BACKOFF_JITTER_FACTOR,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    /// Policy that never waits, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 2,
            jitter: 0.0,
        }
    }

    /// Delay to wait after `failed_attempts` failures
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let delay = BackoffCalculator::calculate_retry_delay(
            failed_attempts.saturating_sub(1),
            self.base_delay,
            self.max_delay,
            self.multiplier,
        );
        BackoffCalculator::apply_jitter(delay, self.jitter)
    }
}

/// Exponential backoff arithmetic
pub struct BackoffCalculator;

impl BackoffCalculator {
    /// Calculate retry delay with exponential backoff
    pub fn calculate_retry_delay(
        retry_count: u32,
        base_delay: Duration,
        max_delay: Duration,
        multiplier: u32,
    ) -> Duration {
        let delay_millis = base_delay.as_millis() as u64;
        let factor = (multiplier as u64).saturating_pow(retry_count);
        let multiplied_delay = delay_millis.saturating_mul(factor);
        let capped_delay = std::cmp::min(multiplied_delay, max_delay.as_millis() as u64);
        Duration::from_millis(capped_delay)
    }

    /// Spread a delay by up to `jitter_percentage` in either direction
    pub fn apply_jitter(delay: Duration, jitter_percentage: f64) -> Duration {
        let millis = delay.as_millis() as u64;
        let jitter_range = (millis as f64 * jitter_percentage.clamp(0.0, 1.0)) as u64;
        if jitter_range == 0 {
            return delay;
        }
        let offset = fastrand::u64(0..=jitter_range * 2);
        Duration::from_millis(millis.saturating_sub(jitter_range).saturating_add(offset))
    }
}

/// Terminal failure of a retried operation
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// Error from the last attempt
    pub error: E,
    /// Attempts actually made
    pub attempts: u32,
    /// True when the loop stopped because the caller asked it to
    pub interrupted: bool,
}

/// Run `op` until it succeeds, fails permanently or runs out of attempts
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    op: F,
) -> Result<T, RetryFailure<E>>
where
    E: Retryable + Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with_backoff_while(policy, label, || true, op).await
}

/// Like [`retry_with_backoff`], but stops before the next attempt once
/// `keep_going` returns false
///
/// The closure receives the zero-based attempt number.
pub async fn retry_with_backoff_while<T, E, F, Fut, K>(
    policy: &RetryPolicy,
    label: &str,
    keep_going: K,
    mut op: F,
) -> Result<T, RetryFailure<E>>
where
    E: Retryable + Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    K: Fn() -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let error = match op(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} attempts", label, attempt + 1);
                }
                return Ok(value);
            }
            Err(e) => e,
        };
        attempt += 1;

        if !error.is_retryable() || attempt >= max_attempts {
            return Err(RetryFailure {
                error,
                attempts: attempt,
                interrupted: false,
            });
        }

        let delay = policy.delay_after(attempt);
        warn!(
            "{} failed (attempt {}/{}): {}. Retrying in {}ms",
            label,
            attempt,
            max_attempts,
            error,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;

        if !keep_going() {
            return Err(RetryFailure {
                error,
                attempts: attempt,
                interrupted: true,
            });
        }
    }
}
