//! Single-flight TTL cache for volatile catalog lookups.
//!
//! Concurrent callers asking for the same key share one fetch; successful
//! results are kept until their TTL passes, failures are never cached.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use discsync::cache::SingleFlightCache;
//!
//! let cache: SingleFlightCache<String, ReleaseDetail, ServiceError> = SingleFlightCache::new();
//!
//! let detail = cache
//!     .get_or_fetch(key, Duration::from_secs(3600), false, || {
//!         let client = client.clone();
//!         async move { client.release(249504).await }
//!     })
//!     .await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now <= self.expires_at
    }
}

struct InFlightFetch<V, E> {
    /// Registration id; cleanup only touches its own registration.
    id: u64,
    handle: SharedFetch<V, E>,
}

struct CacheState<K, V, E> {
    entries: HashMap<K, CacheEntry<V>>,
    in_flight: HashMap<K, InFlightFetch<V, E>>,
    stats: CacheStats,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from a live entry.
    pub hits: u64,
    /// Reads that started a fetch.
    pub misses: u64,
    /// Reads that attached to a fetch already in flight.
    pub joined: u64,
}

/// Keyed cache with get-or-fetch-once semantics and per-entry expiry.
///
/// Clones share state.
pub struct SingleFlightCache<K, V, E> {
    state: Arc<Mutex<CacheState<K, V, E>>>,
    next_id: Arc<AtomicU64>,
}

impl<K, V, E> Clone for SingleFlightCache<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<K, V, E> Default for SingleFlightCache<K, V, E> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                stats: CacheStats::default(),
            })),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<K, V, E> fmt::Debug for SingleFlightCache<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("SingleFlightCache")
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .field("stats", &state.stats)
            .finish()
    }
}

impl<K, V, E> SingleFlightCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<K, V, E>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached value for `key`, or fetch it exactly once.
    ///
    /// - A live entry is returned without calling `fetch` unless
    ///   `force_refresh` is set.
    /// - If a fetch for `key` is already running, the caller attaches to it
    ///   and receives the same result, success or failure.
    /// - Otherwise `fetch` is invoked; on success the value is stored for
    ///   `ttl`. Failures are propagated to every waiter and not stored.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: K,
        ttl: Duration,
        force_refresh: bool,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let handle = {
            let mut state = self.lock();

            if !force_refresh {
                let live = state
                    .entries
                    .get(&key)
                    .filter(|entry| entry.is_live(Instant::now()))
                    .map(|entry| entry.value.clone());
                if let Some(value) = live {
                    state.stats.hits += 1;
                    return Ok(value);
                }
            }

            if let Some(flight) = state.in_flight.get(&key) {
                let handle = flight.handle.clone();
                state.stats.joined += 1;
                handle
            } else {
                state.stats.misses += 1;
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let handle = self.start_fetch(key.clone(), id, ttl, fetch());
                state.in_flight.insert(
                    key,
                    InFlightFetch {
                        id,
                        handle: handle.clone(),
                    },
                );
                handle
            }
        };

        handle.await
    }

    fn start_fetch<Fut>(&self, key: K, id: u64, ttl: Duration, fetch: Fut) -> SharedFetch<V, E>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);

        async move {
            let result = fetch.await;

            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            let still_registered = state.in_flight.get(&key).is_some_and(|f| f.id == id);
            if still_registered {
                state.in_flight.remove(&key);
                if let Ok(value) = &result {
                    state.entries.insert(
                        key,
                        CacheEntry {
                            value: value.clone(),
                            expires_at: Instant::now() + ttl,
                        },
                    );
                }
            }

            result
        }
        .boxed()
        .shared()
    }

    /// Peek at a live entry without fetching.
    pub fn get(&self, key: &K) -> Option<V> {
        let state = self.lock();
        state
            .entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone())
    }

    /// Replace the cached value for `key`.
    ///
    /// A fetch for `key` still in flight delivers its result to its waiters
    /// but no longer writes it into the cache.
    pub fn update(&self, key: K, value: V, ttl: Duration) {
        let mut state = self.lock();
        state.in_flight.remove(&key);
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop the entry for `key`, including any in-flight registration.
    pub fn invalidate(&self, key: &K) {
        let mut state = self.lock();
        state.entries.remove(key);
        state.in_flight.remove(key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.in_flight.clear();
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.lock();
        let now = Instant::now();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_live(now));
        before - state.entries.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let state = self.lock();
        let now = Instant::now();
        state.entries.values().filter(|e| e.is_live(now)).count()
    }

    /// Returns true if there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

impl<K, V, E> SingleFlightCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + AsRef<str> + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Drop every entry whose key starts with `prefix`. Returns how many
    /// cached entries were removed.
    pub fn invalidate_all(&self, prefix: &str) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| !key.as_ref().starts_with(prefix));
        state
            .in_flight
            .retain(|key, _| !key.as_ref().starts_with(prefix));
        before - state.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::oneshot;
    use tokio::time::{advance, sleep};

    type TestCache = SingleFlightCache<String, u32, String>;

    const TTL: Duration = Duration::from_secs(60);

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, String>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                sleep(Duration::from_millis(100)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_fetch() {
        let cache = TestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let waiters = (0..8).map(|i| {
            cache.get_or_fetch("release/1".to_string(), TTL, false, counting_fetch(&calls, i))
        });
        let results = futures::future::join_all(waiters).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == &Ok(0)));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.joined, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = TestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = "release/1".to_string();

        cache
            .get_or_fetch(key.clone(), TTL, false, counting_fetch(&calls, 1))
            .await
            .unwrap();

        advance(Duration::from_secs(59)).await;
        let value = cache
            .get_or_fetch(key.clone(), TTL, false, counting_fetch(&calls, 2))
            .await
            .unwrap();
        assert_eq!(value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&key), None);
        let value = cache
            .get_or_fetch(key, TTL, false, counting_fetch(&calls, 2))
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = TestCache::new();
        let key = "price/1".to_string();

        let err = cache
            .get_or_fetch(key.clone(), TTL, false, || async {
                Err::<u32, _>("boom".to_string())
            })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());

        let value = cache
            .get_or_fetch(key, TTL, false, || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_reaches_every_waiter() {
        let cache = TestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let waiters = (0..4).map(|_| {
            let calls = Arc::clone(&calls);
            cache.get_or_fetch("search/q".to_string(), TTL, false, move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    sleep(Duration::from_millis(10)).await;
                    Err::<u32, _>("unauthenticated".to_string())
                }
            })
        });
        let results = futures::future::join_all(waiters).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == &Err("unauthenticated".to_string())));
    }

    #[tokio::test]
    async fn force_refresh_bypasses_live_entry() {
        let cache = TestCache::new();
        let key = "membership/1".to_string();

        cache
            .get_or_fetch(key.clone(), TTL, false, || async { Ok(1) })
            .await
            .unwrap();
        let value = cache
            .get_or_fetch(key.clone(), TTL, true, || async { Ok(2) })
            .await
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(cache.get(&key), Some(2));
    }

    #[tokio::test]
    async fn update_and_invalidate_keep_reads_consistent() {
        let cache = TestCache::new();
        let key = "membership/1".to_string();

        cache.update(key.clone(), 5, TTL);
        let value = cache
            .get_or_fetch(key.clone(), TTL, false, || async { Ok(99) })
            .await
            .unwrap();
        assert_eq!(value, 5);

        cache.invalidate(&key);
        assert_eq!(cache.get(&key), None);
    }

    #[tokio::test]
    async fn invalidate_all_only_drops_matching_prefix() {
        let cache = TestCache::new();
        cache.update("alice/release/1".to_string(), 1, TTL);
        cache.update("alice/price/1".to_string(), 2, TTL);
        cache.update("bob/release/1".to_string(), 3, TTL);

        let removed = cache.invalidate_all("alice/");

        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"bob/release/1".to_string()), Some(3));
    }

    #[tokio::test]
    async fn invalidated_flight_still_answers_waiters_but_is_not_stored() {
        let cache = TestCache::new();
        let key = "release/9".to_string();
        let (tx, rx) = oneshot::channel::<u32>();

        let waiter = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch(key, TTL, false, move || async move {
                        rx.await.map_err(|e| e.to_string())
                    })
                    .await
            })
        };

        // Let the waiter register its fetch.
        tokio::task::yield_now().await;
        while cache.stats().misses == 0 {
            tokio::task::yield_now().await;
        }

        cache.invalidate(&key);
        tx.send(11).unwrap();

        assert_eq!(waiter.await.unwrap(), Ok(11));
        assert_eq!(cache.get(&key), None);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_removes_dead_entries() {
        let cache = TestCache::new();
        cache.update("a".to_string(), 1, Duration::from_secs(1));
        cache.update("b".to_string(), 2, TTL);

        advance(Duration::from_secs(5)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}
