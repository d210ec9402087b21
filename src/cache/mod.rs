//! Memoizing cache with backoff around unreliable external calls.
//!
//! `RateLimitedCache::get_or_compute` is the only place retries happen:
//! - unexpired hits return without calling `compute`
//! - at most one computation per key runs at a time; concurrent callers
//!   for the same key wait for it and share its outcome, failures included
//! - transient failures are retried with exponential backoff
//! - failures are never stored, so the next caller after a failure computes again
//! - a zero `ttl` keeps retry and single-flight but stores nothing

pub mod backoff;

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::AgentResult;

pub use backoff::BackoffPolicy;

/// A stored value and its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Entries are evicted once `now` is strictly past `expires_at`
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Counters exposed for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Invocations of `compute`, retries included
    pub computations: u64,
    pub retries: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    retries: AtomicU64,
}

/// Outcome of an in-flight computation, `None` until the leader finishes
type Flight<V> = watch::Receiver<Option<AgentResult<V>>>;

/// A value from the cache, and whether this request computed it
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    /// False when the value was already stored before this request
    pub fresh: bool,
}

/// Removes the flight entry if its leader is dropped before finishing
struct FlightGuard<'a, K: Eq + Hash, V> {
    flights: &'a Mutex<HashMap<K, Flight<V>>>,
    key: &'a K,
    armed: bool,
}

impl<K: Eq + Hash, V> Drop for FlightGuard<'_, K, V> {
    fn drop(&mut self) {
        if self.armed {
            let mut flights = self.flights.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            flights.remove(self.key);
        }
    }
}

/// TTL cache with single-flight computation and bounded retry
pub struct RateLimitedCache<K, V> {
    /// Label used in logs
    name: &'static str,

    policy: BackoffPolicy,

    entries: Mutex<HashMap<K, CacheEntry<V>>>,

    /// Computations currently running, by key
    in_flight: Mutex<HashMap<K, Flight<V>>>,

    counters: Counters,
}

impl<K, V> RateLimitedCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(name: &'static str, policy: BackoffPolicy) -> Self {
        Self {
            name,
            policy,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Return the cached value for `key`, or compute and store it for `ttl`.
    ///
    /// `compute` is invoked once per attempt. Retryable failures back off
    /// per the policy; when attempts run out the last error is returned
    /// unchanged and nothing is stored.
    pub async fn get_or_compute<F, Fut>(&self, key: K, ttl: Duration, compute: F) -> AgentResult<V>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AgentResult<V>>,
    {
        self.fetch(key, ttl, compute).await.map(|cached| cached.value)
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but also reports
    /// whether the value was computed for this request.
    ///
    /// Callers that waited on another request's computation receive its
    /// outcome and count as fresh.
    pub async fn fetch<F, Fut>(&self, key: K, ttl: Duration, mut compute: F) -> AgentResult<Cached<V>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AgentResult<V>>,
    {
        loop {
            if let Some(value) = self.stored_hit(&key) {
                return Ok(Cached { value, fresh: false });
            }

            let leader = {
                let mut in_flight = self.in_flight();
                match in_flight.get(&key) {
                    Some(flight) => Err(flight.clone()),
                    None => {
                        // A leader may have stored its value after our first lookup.
                        if let Some(value) = self.stored_hit(&key) {
                            return Ok(Cached { value, fresh: false });
                        }
                        let (tx, rx) = watch::channel(None);
                        in_flight.insert(key.clone(), rx);
                        Ok(tx)
                    }
                }
            };

            let tx = match leader {
                Ok(tx) => tx,
                Err(mut flight) => {
                    let shared = match flight.wait_for(Option::is_some).await {
                        Ok(outcome) => (*outcome).clone(),
                        Err(_) => None,
                    };
                    match shared {
                        Some(Ok(value)) => {
                            self.counters.hits.fetch_add(1, Ordering::Relaxed);
                            debug!(cache = self.name, ?key, "Shared in-flight result");
                            return Ok(Cached { value, fresh: true });
                        }
                        Some(Err(e)) => {
                            debug!(cache = self.name, ?key, error = %e, "Shared in-flight failure");
                            return Err(e);
                        }
                        // The leader was dropped before finishing; try again.
                        None => continue,
                    }
                }
            };

            let mut guard = FlightGuard {
                flights: &self.in_flight,
                key: &key,
                armed: true,
            };

            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            let result = self.compute_with_backoff(&key, &mut compute).await;
            if let Ok(ref value) = result {
                if !ttl.is_zero() {
                    self.store(key.clone(), value.clone(), ttl);
                }
            }

            {
                let mut in_flight = self.in_flight();
                in_flight.remove(&key);
                tx.send_replace(Some(result.clone()));
            }
            guard.armed = false;

            return result.map(|value| Cached { value, fresh: true });
        }
    }

    /// Look up an unexpired value without computing
    pub fn peek(&self, key: &K) -> Option<V> {
        self.lookup(key)
    }

    /// Drop a single entry
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of stored entries (expired ones included until looked up)
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            computations: self.counters.computations.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
        }
    }

    async fn compute_with_backoff<F, Fut>(&self, key: &K, compute: &mut F) -> AgentResult<V>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AgentResult<V>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.counters.computations.fetch_add(1, Ordering::Relaxed);

            let error = match compute().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            if !self.policy.should_retry(attempt) {
                warn!(
                    cache = self.name,
                    ?key,
                    attempt,
                    error = %error,
                    "External call failed, retries exhausted"
                );
                return Err(error);
            }

            let delay = self.policy.delay_for_attempt(attempt);
            warn!(
                cache = self.name,
                ?key,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "External call failed, backing off"
            );
            self.counters.retries.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(delay).await;
        }
    }

    /// `lookup` that counts a hit
    fn stored_hit(&self, key: &K) -> Option<V> {
        let value = self.lookup(key)?;
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, ?key, "Cache hit");
        Some(value)
    }

    /// Unexpired value for `key`; expired entries are evicted here
    fn lookup(&self, key: &K) -> Option<V> {
        let mut entries = self.entries();

        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry.is_expired(Instant::now()),
        };

        if expired {
            entries.remove(key);
            debug!(cache = self.name, ?key, "Evicted expired entry");
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    fn store(&self, key: K, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries().insert(key, CacheEntry { value, expires_at });
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<K, Flight<V>>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;

    fn cache() -> RateLimitedCache<String, u32> {
        RateLimitedCache::new("test", BackoffPolicy::new(3, 10, 100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_skips_compute() {
        let cache = cache();
        let ttl = Duration::from_secs(60);

        let first = cache
            .get_or_compute("k".to_string(), ttl, || async { Ok(7) })
            .await;
        let second = cache
            .get_or_compute("k".to_string(), ttl, || async {
                Err(AgentError::Internal("must not run".into()))
            })
            .await;

        assert_eq!(first, Ok(7));
        assert_eq!(second, Ok(7));
        assert_eq!(cache.stats().computations, 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_is_not_retried_or_stored() {
        let cache = cache();

        let result = cache
            .get_or_compute("k".to_string(), Duration::from_secs(60), || async {
                Err(AgentError::Auth("revoked".into()))
            })
            .await;

        assert_eq!(result, Err(AgentError::Auth("revoked".into())));
        assert_eq!(cache.stats().computations, 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_recompute() {
        let cache = cache();
        let ttl = Duration::from_secs(60);
        let key = "k".to_string();

        cache.get_or_compute(key.clone(), ttl, || async { Ok(1) }).await.unwrap();
        assert!(cache.invalidate(&key));
        let value = cache.get_or_compute(key.clone(), ttl, || async { Ok(2) }).await;

        assert_eq!(value, Ok(2));
        assert_eq!(cache.peek(&key), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_computation_releases_key() {
        let cache = cache();
        let ttl = Duration::from_secs(60);

        let slow = cache.get_or_compute("k".to_string(), ttl, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1)
        });
        assert!(tokio::time::timeout(Duration::from_millis(10), slow).await.is_err());

        let value = cache.get_or_compute("k".to_string(), ttl, || async { Ok(2) }).await;
        assert_eq!(value, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_not_stored() {
        let cache = cache();
        let key = "k".to_string();

        cache.get_or_compute(key.clone(), Duration::ZERO, || async { Ok(1) }).await.unwrap();
        cache.get_or_compute(key.clone(), Duration::ZERO, || async { Ok(2) }).await.unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().computations, 2);
    }
}
