//! RateLimitedCache tests: single-flight, TTL expiry and backoff.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;

use trendcast::cache::{BackoffPolicy, RateLimitedCache};
use trendcast::AgentError;

fn cache(max_attempts: u32) -> RateLimitedCache<String, u32> {
    RateLimitedCache::new("test", BackoffPolicy::new(max_attempts, 100, 1_000))
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_compute_once() {
    let cache = cache(3);
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let requests = (0..8).map(|_| {
        cache.get_or_compute("trends".to_string(), Duration::from_secs(60), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            // Hold the computation open so every caller piles up behind it.
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(42)
        })
    });
    let results = join_all(requests).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| *r == Ok(42)));
    assert_eq!(cache.stats().computations, 1);
    assert_eq!(cache.stats().hits, 7);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_share_a_failure() {
    let cache = cache(3);
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let requests = (0..5).map(|_| {
        cache.get_or_compute("trends".to_string(), Duration::from_secs(60), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err::<u32, _>(AgentError::RateLimited(format!("attempt {}", n)))
        })
    });
    let results = join_all(requests).await;

    // One retry sequence upstream, however many callers were waiting.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(results
        .iter()
        .all(|r| *r == Err(AgentError::RateLimited("attempt 3".into()))));
    assert_eq!(cache.stats().computations, 3);
    assert!(cache.is_empty());

    // The failure was shared, not stored.
    let value = cache
        .get_or_compute("trends".to_string(), Duration::from_secs(60), || async { Ok(9) })
        .await;
    assert_eq!(value, Ok(9));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_reports_freshness() {
    let cache = cache(3);
    let ttl = Duration::from_secs(60);

    let first = cache.fetch("k".to_string(), ttl, || async { Ok(1) }).await.unwrap();
    let second = cache.fetch("k".to_string(), ttl, || async { Ok(2) }).await.unwrap();

    assert_eq!((first.value, first.fresh), (1, true));
    assert_eq!((second.value, second.fresh), (1, false));
}

#[tokio::test(start_paused = true)]
async fn test_distinct_keys_compute_independently() {
    let cache = cache(3);
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let requests = ["a", "b", "c"].into_iter().map(|key| {
        cache.get_or_compute(key.to_string(), Duration::from_secs(60), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        })
    });
    join_all(requests).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(cache.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_recomputes_once() {
    let cache = cache(3);
    let ttl = Duration::from_secs(30);
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let compute = move || async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) };

    assert_eq!(cache.get_or_compute("k".to_string(), ttl, compute).await, Ok(1));

    // Exactly at the expiry instant the entry is still valid.
    tokio::time::advance(ttl).await;
    assert_eq!(cache.get_or_compute("k".to_string(), ttl, compute).await, Ok(1));

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(cache.get_or_compute("k".to_string(), ttl, compute).await, Ok(2));
    assert_eq!(cache.get_or_compute("k".to_string(), ttl, compute).await, Ok(2));

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_increase_until_cap() {
    // 100ms base, 250ms cap: 100, 200, 250, 250
    let cache: RateLimitedCache<String, &str> =
        RateLimitedCache::new("test", BackoffPolicy::new(6, 100, 250));
    let log: Mutex<Vec<Instant>> = Mutex::new(Vec::new());
    let attempts = &log;

    let result = cache
        .get_or_compute("k".to_string(), Duration::from_secs(60), move || async move {
            let mut attempts = attempts.lock().unwrap();
            attempts.push(Instant::now());
            if attempts.len() <= 4 {
                Err(AgentError::Transient("upstream flaked".into()))
            } else {
                Ok("ok")
            }
        })
        .await;

    assert_eq!(result, Ok("ok"));
    assert_eq!(cache.stats().retries, 4);

    let attempts = log.into_inner().unwrap();
    let gaps: Vec<u128> = attempts
        .windows(2)
        .map(|w| (w[1] - w[0]).as_millis())
        .collect();
    assert_eq!(gaps, vec![100, 200, 250, 250]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_return_last_error_and_store_nothing() {
    let cache = cache(3);
    let calls = Arc::new(AtomicU32::new(0));

    let result = cache
        .get_or_compute("k".to_string(), Duration::from_secs(60), || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<u32, _>(AgentError::RateLimited(format!("attempt {}", n)))
            }
        })
        .await;

    assert_eq!(result, Err(AgentError::RateLimited("attempt 3".into())));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(cache.is_empty());

    // No negative caching: the next request computes again.
    let value = cache
        .get_or_compute("k".to_string(), Duration::from_secs(60), || async { Ok(5) })
        .await;
    assert_eq!(value, Ok(5));
}
