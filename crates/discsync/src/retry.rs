//! Retry utilities for transient store failures.
//!
//! Rate-limit rejections from the catalog service are handled by the
//! [`RateLimiter`](crate::platform::RateLimiter); this module covers the
//! other retryable failure class, a busy or briefly unreachable database.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

/// First delay before retrying a transient store error.
pub const INITIAL_BACKOFF_MS: u64 = 50;
/// Upper bound on the delay between store retries.
pub const MAX_BACKOFF_MS: u64 = 2_000;
/// Retries after the first failed attempt.
pub const MAX_STORE_RETRIES: usize = 4;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: MAX_STORE_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Build the default exponential backoff strategy for store operations.
#[must_use]
pub fn default_backoff() -> ExponentialBuilder {
    RetryConfig::default().into_backoff()
}

/// Execute an operation, retrying errors that `is_transient` accepts.
///
/// Every retry is logged at `debug` with the attempt number and delay.
/// Errors rejected by `is_transient` are returned immediately.
///
/// # Example
///
/// ```ignore
/// use discsync::retry::{RetryConfig, with_retry};
///
/// let rows = with_retry(
///     || async { Entity::find().all(&db).await },
///     is_retryable_db_error,
///     RetryConfig::default(),
///     "load entries",
/// )
/// .await?;
/// ```
pub async fn with_retry<T, E, F, Fut, IsTransient>(
    mut operation: F,
    is_transient: IsTransient,
    config: RetryConfig,
    label: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    IsTransient: FnMut(&E) -> bool,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.into_backoff())
        .notify(|err, dur| {
            tracing::debug!(
                operation = label,
                attempt = attempt.load(Ordering::SeqCst),
                delay_ms = dur.as_millis() as u64,
                error = %err,
                "Transient failure, retrying"
            );
        })
        .when(is_transient)
        .await
}
