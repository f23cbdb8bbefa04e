use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::time::{Instant, sleep, sleep_until};

use crate::entity::list_type::ListType;

use super::credentials::{CredentialStore, Credentials};
use super::errors::{Result, ServiceError};
use super::types::{
    CatalogFetcher, FetchOutcome, LibraryItem, ListPage, MarketStats, Membership, PaginationInfo,
    ReleaseDetail, SearchResult,
};

/// Default rate limits for the catalog service.
pub mod rate_limits {
    /// Authenticated clients get 60 requests per moving minute.
    pub const CATALOG_REQUESTS_PER_MINUTE: u32 = 60;
    /// Requests admitted back to back after an idle period.
    pub const CATALOG_BURST: u32 = 3;
    /// Upper bound of the random jitter added to computed waits.
    pub const MAX_JITTER_MS: u64 = 50;
    /// Cap for the exponential backoff branch.
    pub const MAX_BACKOFF_SECS: u64 = 60;
    /// Cap for a server-directed `Retry-After` and for any enforced window.
    pub const MAX_RETRY_AFTER_SECS: u64 = 86_400;
    /// Attempts per request before a rate-limit rejection is surfaced.
    pub const MAX_RATE_LIMIT_ATTEMPTS: u32 = 5;
}

/// Token counts this close to a whole token are treated as whole.
const TOKEN_EPSILON: f64 = 1e-9;

/// Tuning for a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Maximum tokens the bucket holds (burst size).
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_per_second: f64,
    /// Upper bound of the jitter added to refill waits and backoffs.
    pub max_jitter: Duration,
    /// Cap for exponential backoff when the server gives no `Retry-After`.
    pub max_backoff: Duration,
}

impl RateLimitConfig {
    /// Configure from a requests-per-minute budget and a burst size.
    ///
    /// Zero values are clamped to one.
    pub fn per_minute(requests_per_minute: u32, burst: u32) -> Self {
        Self {
            capacity: f64::from(burst.max(1)),
            refill_per_second: f64::from(requests_per_minute.max(1)) / 60.0,
            max_jitter: Duration::from_millis(rate_limits::MAX_JITTER_MS),
            max_backoff: Duration::from_secs(rate_limits::MAX_BACKOFF_SECS),
        }
    }

    /// Configure from a requests-per-second budget and a burst size.
    pub fn per_second(requests_per_second: u32, burst: u32) -> Self {
        Self {
            refill_per_second: f64::from(requests_per_second.max(1)),
            ..Self::per_minute(60, burst)
        }
    }

    /// Set the jitter bound.
    #[must_use]
    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Set the exponential backoff cap.
    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(
            rate_limits::CATALOG_REQUESTS_PER_MINUTE,
            rate_limits::CATALOG_BURST,
        )
    }
}

/// Snapshot of the token bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBucketState {
    pub tokens: f64,
    pub capacity: f64,
    pub refill_per_second: f64,
    pub last_refill_at: Instant,
    pub enforced_wait_until: Instant,
}

enum Admission {
    Admitted,
    Enforced(Instant),
    Refill(Duration),
}

impl TokenBucketState {
    fn new(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            tokens: config.capacity,
            capacity: config.capacity,
            refill_per_second: config.refill_per_second,
            last_refill_at: now,
            enforced_wait_until: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill_at);
        self.tokens =
            (self.tokens + elapsed.as_secs_f64() * self.refill_per_second).min(self.capacity);
        self.last_refill_at = now;
    }

    fn try_admit(&mut self, now: Instant) -> Admission {
        self.refill(now);

        if self.enforced_wait_until > now {
            return Admission::Enforced(self.enforced_wait_until);
        }

        if self.tokens + TOKEN_EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            return Admission::Admitted;
        }

        let deficit = 1.0 - self.tokens;
        Admission::Refill(Duration::from_secs_f64(deficit / self.refill_per_second))
    }
}

fn max_window() -> Duration {
    Duration::from_secs(rate_limits::MAX_RETRY_AFTER_SECS)
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

/// Token-bucket admission gate with a server-directed override.
///
/// One instance is shared by every caller talking to the same service.
/// Clones share state. The limiter never fails; it only delays.
///
/// # Example
///
/// ```ignore
/// use discsync::platform::{RateLimiter, RateLimitConfig};
///
/// let limiter = RateLimiter::new(RateLimitConfig::per_minute(60, 3));
///
/// // Before each API call:
/// limiter.acquire().await;
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<Mutex<TokenBucketState>>,
}

impl RateLimiter {
    /// Create a limiter with a full bucket.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(TokenBucketState::new(&config, Instant::now()))),
            config,
        }
    }

    /// The configuration this limiter was built with.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TokenBucketState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait until a request is admitted.
    ///
    /// Honours an outstanding enforced window first, then the token bucket.
    pub async fn acquire(&self) {
        loop {
            let admission = self.lock().try_admit(Instant::now());

            match admission {
                Admission::Admitted => return,
                Admission::Enforced(until) => {
                    tracing::debug!(
                        wait_ms = until.saturating_duration_since(Instant::now()).as_millis() as u64,
                        "Admission held by enforced backoff window"
                    );
                    sleep_until(until).await;
                }
                Admission::Refill(wait) => {
                    let wait = wait + jitter(self.config.max_jitter);
                    tracing::trace!(wait_ms = wait.as_millis() as u64, "Waiting for token refill");
                    sleep(wait).await;
                }
            }
        }
    }

    /// Compute the delay for a rate-limit rejection.
    ///
    /// `retry_after` wins when present; otherwise `2^attempt` seconds capped
    /// at the configured maximum. Jitter is added in both cases.
    pub fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let base = match retry_after {
            Some(delay) => delay.min(max_window()),
            None => {
                let secs = 2u64.saturating_pow(attempt.min(32));
                Duration::from_secs(secs).min(self.config.max_backoff)
            }
        };
        base.saturating_add(jitter(self.config.max_jitter))
    }

    /// Record an enforced window of `delay` from now without sleeping.
    ///
    /// The window only ever grows: a shorter delay never shortens a window
    /// that is already in force. Returns the effective end of the window.
    pub fn defer(&self, delay: Duration) -> Instant {
        let mut state = self.lock();
        let until = Instant::now() + delay.min(max_window());
        if until > state.enforced_wait_until {
            state.enforced_wait_until = until;
        }
        state.enforced_wait_until
    }

    /// Enforce `delay` for every caller and suspend until the window ends.
    pub async fn hold(&self, delay: Duration) -> Duration {
        let until = self.defer(delay);
        let wait = until.saturating_duration_since(Instant::now());
        sleep_until(until).await;
        wait
    }

    /// React to a rate-limit rejection.
    ///
    /// Blocks admissions for the computed delay and suspends the caller
    /// until the enforced window has passed. Returns how long it waited.
    pub async fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = self.backoff_delay(attempt, retry_after);
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            server_directed = retry_after.is_some(),
            "Backing off after rate limit"
        );
        self.hold(delay).await
    }

    /// Tokens currently available (after refilling up to now).
    pub fn available_tokens(&self) -> f64 {
        let mut state = self.lock();
        state.refill(Instant::now());
        state.tokens
    }

    /// Time left in the enforced backoff window.
    pub fn enforced_wait_remaining(&self) -> Duration {
        self.lock()
            .enforced_wait_until
            .saturating_duration_since(Instant::now())
    }

    /// Copy of the bucket state.
    pub fn snapshot(&self) -> TokenBucketState {
        *self.lock()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Callback invoked before each rate-limit backoff: `(attempt, delay)`.
pub type BackoffNotify<'a> = dyn Fn(u32, Duration) + Send + Sync + 'a;

/// Checked around each rate-limit backoff; `false` abandons the request.
pub type RetryGate<'a> = dyn Fn() -> bool + Send + Sync + 'a;

/// Caller hooks into the rate-limit retry loop.
#[derive(Clone, Copy, Default)]
pub struct RetryHooks<'a> {
    pub on_backoff: Option<&'a BackoffNotify<'a>>,
    pub keep_retrying: Option<&'a RetryGate<'a>>,
}

impl RetryHooks<'_> {
    fn wants_retry(&self) -> bool {
        self.keep_retrying.is_none_or(|gate| gate())
    }
}

/// A governed wrapper around any [`CatalogFetcher`].
///
/// Every call waits for the shared [`RateLimiter`], reads the current
/// credentials, retries rate-limit rejections with [`RateLimiter::backoff`]
/// up to a bounded number of attempts, and invalidates the credentials when
/// the service rejects them.
///
/// # Example
///
/// ```ignore
/// use discsync::platform::{CredentialStore, RateLimitedClient, RateLimiter};
///
/// let client = RateLimitedClient::new(catalog_client, RateLimiter::default(), credentials);
/// let release = client.release(249504).await?;
/// ```
pub struct RateLimitedClient<F> {
    inner: F,
    limiter: RateLimiter,
    credentials: CredentialStore,
    max_attempts: u32,
}

impl<F> RateLimitedClient<F> {
    /// Create a new governed client.
    pub fn new(inner: F, limiter: RateLimiter, credentials: CredentialStore) -> Self {
        Self {
            inner,
            limiter,
            credentials,
            max_attempts: rate_limits::MAX_RATE_LIMIT_ATTEMPTS,
        }
    }

    /// Set the number of attempts per request before a rate-limit rejection
    /// is surfaced (minimum 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Get a reference to the inner fetcher.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// The shared rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The shared credential store.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }
}

impl<F: Clone> Clone for RateLimitedClient<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            credentials: self.credentials.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

impl<F: CatalogFetcher> RateLimitedClient<F> {
    async fn call<T, Op, Fut>(
        &self,
        resource: &str,
        max_attempts: u32,
        hooks: RetryHooks<'_>,
        op: Op,
    ) -> Result<(T, Option<PaginationInfo>)>
    where
        Op: Fn(Credentials) -> Fut,
        Fut: Future<Output = FetchOutcome<T>>,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            self.limiter.acquire().await;

            let credentials = self
                .credentials
                .current()
                .ok_or(ServiceError::Unauthenticated)?;

            attempt += 1;
            match op(credentials.clone()).await {
                FetchOutcome::Ok {
                    payload,
                    pagination,
                } => return Ok((payload, pagination)),
                FetchOutcome::RateLimited { retry_after } => {
                    if attempt >= max_attempts {
                        tracing::warn!(
                            resource,
                            attempts = attempt,
                            "Rate limit retries exhausted"
                        );
                        return Err(ServiceError::RateLimited {
                            attempts: attempt,
                            retry_after,
                        });
                    }

                    let delay = self.limiter.backoff_delay(attempt - 1, retry_after);
                    if !hooks.wants_retry() {
                        // The window still applies to everyone else
                        self.limiter.defer(delay);
                        tracing::debug!(resource, attempts = attempt, "Retry abandoned");
                        return Err(ServiceError::RateLimited {
                            attempts: attempt,
                            retry_after,
                        });
                    }

                    tracing::warn!(
                        resource,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                    if let Some(notify) = hooks.on_backoff {
                        notify(attempt, delay);
                    }
                    self.limiter.hold(delay).await;

                    if !hooks.wants_retry() {
                        tracing::debug!(resource, attempts = attempt, "Retry abandoned");
                        return Err(ServiceError::RateLimited {
                            attempts: attempt,
                            retry_after,
                        });
                    }
                }
                FetchOutcome::Unauthorized => {
                    self.credentials.invalidate_if_current(&credentials);
                    return Err(ServiceError::Unauthenticated);
                }
                FetchOutcome::NotFound => return Err(ServiceError::not_found(resource)),
                // A successful status that still failed means the body did not decode
                FetchOutcome::Failed {
                    status: Some(status),
                    message,
                } if (200..300).contains(&status) => return Err(ServiceError::decode(message)),
                FetchOutcome::Failed {
                    status: Some(status),
                    message,
                } => return Err(ServiceError::api(status, message)),
                FetchOutcome::Failed {
                    status: None,
                    message,
                } => return Err(ServiceError::network(message)),
            }
        }
    }

    /// Fetch one page of a list.
    ///
    /// A response without pagination metadata is treated as the last page.
    pub async fn list_page(&self, list_type: ListType, page: u32, per_page: u32) -> Result<ListPage> {
        self.list_page_with(list_type, page, per_page, self.max_attempts, RetryHooks::default())
            .await
    }

    /// Fetch one page of a list with an explicit attempt budget.
    ///
    /// `hooks.on_backoff` sees every rate-limit backoff; once
    /// `hooks.keep_retrying` returns `false` the pending rejection is
    /// surfaced instead of retried.
    pub async fn list_page_with(
        &self,
        list_type: ListType,
        page: u32,
        per_page: u32,
        max_attempts: u32,
        hooks: RetryHooks<'_>,
    ) -> Result<ListPage> {
        let resource = format!("{list_type} page {page}");
        let (items, pagination) = self
            .call(&resource, max_attempts, hooks, |creds| async move {
                self.inner
                    .fetch_list_page(&creds, list_type, page, per_page)
                    .await
            })
            .await?;

        let pagination = pagination.unwrap_or(PaginationInfo {
            page,
            total_pages: page,
            per_page,
            total_items: (u64::from(page.saturating_sub(1)) * u64::from(per_page))
                + items.len() as u64,
        });

        Ok(ListPage { items, pagination })
    }

    /// Fetch full release detail.
    pub async fn release(&self, release_id: u64) -> Result<ReleaseDetail> {
        let resource = format!("release {release_id}");
        self.call(&resource, self.max_attempts, RetryHooks::default(), |creds| async move {
            self.inner.fetch_release(&creds, release_id).await
        })
        .await
        .map(|(detail, _)| detail)
    }

    /// Search the catalog.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let resource = format!("search '{query}'");
        self.call(&resource, self.max_attempts, RetryHooks::default(), |creds| async move {
            self.inner.search(&creds, query).await
        })
        .await
        .map(|(results, _)| results)
    }

    /// Fetch marketplace price statistics.
    pub async fn market_stats(&self, release_id: u64) -> Result<MarketStats> {
        let resource = format!("price stats {release_id}");
        self.call(&resource, self.max_attempts, RetryHooks::default(), |creds| async move {
            self.inner.fetch_market_stats(&creds, release_id).await
        })
        .await
        .map(|(stats, _)| stats)
    }

    /// Check whether a release is on one of the user's lists.
    ///
    /// Not-found is a negative answer, not an error.
    pub async fn membership(&self, list_type: ListType, release_id: u64) -> Result<Membership> {
        let resource = format!("{list_type} membership {release_id}");
        let result = self
            .call(&resource, self.max_attempts, RetryHooks::default(), |creds| async move {
                self.inner
                    .fetch_membership(&creds, list_type, release_id)
                    .await
            })
            .await;

        match result {
            Ok((items, _)) => Ok(Membership::from_items(list_type, release_id, &items)),
            Err(ServiceError::NotFound { .. }) => Ok(Membership::absent(list_type, release_id)),
            Err(e) => Err(e),
        }
    }

    /// Add a release to a list.
    pub async fn add_to_list(&self, list_type: ListType, release_id: u64) -> Result<LibraryItem> {
        let resource = format!("{list_type} add {release_id}");
        self.call(&resource, self.max_attempts, RetryHooks::default(), |creds| async move {
            self.inner.add_to_list(&creds, list_type, release_id).await
        })
        .await
        .map(|(item, _)| item)
    }

    /// Remove a release (or one collection copy, as `(folder_id, instance_id)`)
    /// from a list.
    pub async fn remove_from_list(
        &self,
        list_type: ListType,
        release_id: u64,
        instance: Option<(u64, u64)>,
    ) -> Result<()> {
        let resource = format!("{list_type} remove {release_id}");
        self.call(&resource, self.max_attempts, RetryHooks::default(), |creds| async move {
            self.inner
                .remove_from_list(&creds, list_type, release_id, instance)
                .await
        })
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(config: RateLimitConfig) -> RateLimitConfig {
        config.with_jitter(Duration::ZERO)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_is_admitted_immediately_then_throttled() {
        // capacity 3, one token per second
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(60, 3));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn steady_state_never_exceeds_refill_rate() {
        let limiter = RateLimiter::new(no_jitter(RateLimitConfig::per_second(4, 1)));
        let start = Instant::now();

        for _ in 0..9 {
            limiter.acquire().await;
        }

        // First admission is free, the remaining eight need 8 * 250ms.
        assert!(start.elapsed() >= Duration::from_millis(2000));
        assert!(start.elapsed() < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn bucket_refills_after_idle_period_but_not_past_capacity() {
        let limiter = RateLimiter::new(no_jitter(RateLimitConfig::per_second(1, 2)));
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(limiter.available_tokens() < 1.0);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!((limiter.available_tokens() - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn enforced_window_blocks_even_with_tokens_available() {
        let limiter = RateLimiter::new(no_jitter(RateLimitConfig::per_minute(60, 5)));
        let delay = limiter.backoff_delay(0, Some(Duration::from_secs(5)));
        limiter.defer(delay);

        assert!(limiter.available_tokens() >= 1.0);

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_backoff_does_not_shorten_enforced_window() {
        let limiter = RateLimiter::new(no_jitter(RateLimitConfig::default()));
        let first = limiter.defer(Duration::from_secs(5));
        let second = limiter.defer(Duration::from_secs(1));

        assert_eq!(first, second);
        assert!(limiter.enforced_wait_remaining() >= Duration::from_secs(5));

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn longer_backoff_extends_enforced_window() {
        let limiter = RateLimiter::new(no_jitter(RateLimitConfig::default()));
        limiter.defer(Duration::from_secs(2));
        let extended = limiter.defer(Duration::from_secs(10));

        assert_eq!(limiter.snapshot().enforced_wait_until, extended);
        assert!(limiter.enforced_wait_remaining() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_suspends_caller_and_other_acquirers() {
        let limiter = RateLimiter::new(no_jitter(RateLimitConfig::default()));
        let start = Instant::now();

        let other = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                limiter.acquire().await;
                Instant::now()
            })
        };

        let waited = limiter.backoff(0, Some(Duration::from_secs(3))).await;
        assert!(waited >= Duration::from_secs(3));
        assert!(start.elapsed() >= Duration::from_secs(3));

        let admitted_at = other.await.expect("acquirer task");
        assert!(admitted_at.duration_since(start) >= Duration::from_secs(3));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let limiter = RateLimiter::new(
            RateLimitConfig::default()
                .with_jitter(Duration::ZERO)
                .with_max_backoff(Duration::from_secs(8)),
        );
        assert_eq!(limiter.backoff_delay(0, None), Duration::from_secs(1));
        assert_eq!(limiter.backoff_delay(2, None), Duration::from_secs(4));
        assert_eq!(limiter.backoff_delay(10, None), Duration::from_secs(8));
        assert_eq!(
            limiter.backoff_delay(10, Some(Duration::from_secs(90))),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn oversized_retry_after_is_capped() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let delay = limiter.backoff_delay(0, Some(Duration::MAX));
        assert!(delay >= max_window());
        assert!(delay <= max_window() + Duration::from_millis(rate_limits::MAX_JITTER_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn huge_enforced_window_saturates_instead_of_overflowing() {
        let limiter = RateLimiter::new(no_jitter(RateLimitConfig::default()));
        let until = limiter.defer(Duration::from_secs(u64::MAX));
        assert_eq!(until.duration_since(Instant::now()), max_window());

        let waiter = limiter.clone();
        let waited = tokio::spawn(async move {
            waiter.backoff(0, Some(Duration::from_secs(u64::MAX))).await
        })
        .await
        .expect("backoff task");
        assert!(waited <= max_window());
    }

    #[test]
    fn jitter_stays_within_bound() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        for _ in 0..100 {
            let delay = limiter.backoff_delay(0, Some(Duration::from_secs(1)));
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_millis(1000 + rate_limits::MAX_JITTER_MS));
        }
    }

    #[test]
    fn per_minute_clamps_zero_values() {
        let config = RateLimitConfig::per_minute(0, 0);
        assert_eq!(config.capacity, 1.0);
        assert!(config.refill_per_second > 0.0);
    }
}
