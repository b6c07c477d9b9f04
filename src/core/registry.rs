//! Endpoint concurrency registry
//!
//! Owns one bounded worker pool per distinct target url. Pools are created
//! lazily on first use and live for the rest of the process.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinHandle};

use super::metrics::POOL_IN_FLIGHT;

/// Bounded worker pool for a single target url
pub struct EndpointPool {
    url: String,
    size: usize,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
}

impl EndpointPool {
    fn new(url: &str, size: usize) -> Self {
        // a zero-sized pool would never run anything; config rejects it anyway
        let size = size.max(1);
        Self {
            url: url.to_string(),
            size,
            permits: Arc::new(Semaphore::new(size)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Maximum number of tasks running at once
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of tasks currently holding a worker slot
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Schedule `task` on this pool.
    ///
    /// The task starts once a worker slot is free. Tasks on the same pool
    /// complete in no particular order.
    pub fn submit<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permits = self.permits.clone();
        let in_flight = self.in_flight.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            // the semaphore is never closed, acquisition can only wait
            let _permit = permits.acquire_owned().await;
            let _slot = InFlightSlot::enter(in_flight, url);
            task.await
        })
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            url: self.url.clone(),
            size: self.size,
            in_flight: self.in_flight(),
        }
    }
}

/// Tracks a running task for the in-flight counter and gauge.
struct InFlightSlot {
    counter: Arc<AtomicUsize>,
    url: String,
}

impl InFlightSlot {
    fn enter(counter: Arc<AtomicUsize>, url: String) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        POOL_IN_FLIGHT.with_label_values(&[url.as_str()]).inc();
        Self { counter, url }
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
        POOL_IN_FLIGHT.with_label_values(&[self.url.as_str()]).dec();
    }
}

/// Snapshot of one pool for the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub url: String,
    pub size: usize,
    pub in_flight: usize,
}

/// Process-wide map from target url to its pool
#[derive(Default)]
pub struct PoolRegistry {
    pools: DashMap<String, Arc<EndpointPool>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the pool for `url`, creating it with `max_concurrency` workers on first use.
    ///
    /// Creation is atomic per url: concurrent first callers all observe the
    /// same pool. Existing pools are never resized.
    pub fn acquire_pool(&self, url: &str, max_concurrency: usize) -> Arc<EndpointPool> {
        // the read guard must be released before `entry` takes the shard write lock
        let existing = self.pools.get(url).map(|entry| entry.value().clone());
        let pool = match existing {
            Some(pool) => pool,
            None => self
                .pools
                .entry(url.to_string())
                .or_insert_with(|| {
                    info!("Creating endpoint pool for {url} with {max_concurrency} workers");
                    Arc::new(EndpointPool::new(url, max_concurrency))
                })
                .value()
                .clone(),
        };

        if pool.size() != max_concurrency.max(1) {
            warn!(
                "Endpoint pool for {url} keeps {} workers, requested {max_concurrency}",
                pool.size()
            );
        } else {
            debug!("Using endpoint pool for {url}");
        }

        pool
    }

    /// Number of pools created so far
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Stats of every pool, ordered by url
    pub fn snapshot(&self) -> Vec<PoolStats> {
        let mut stats: Vec<PoolStats> = self.pools.iter().map(|entry| entry.stats()).collect();
        stats.sort_by(|a, b| a.url.cmp(&b.url));
        stats
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn test_acquire_creates_once() {
        let registry = PoolRegistry::new();
        assert!(registry.is_empty());

        let first = registry.acquire_pool("http://a/items", 3);
        let second = registry.acquire_pool("http://a/items", 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.size(), 3);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_pool_is_never_resized() {
        let registry = PoolRegistry::new();
        registry.acquire_pool("http://a/items", 2);
        let pool = registry.acquire_pool("http://a/items", 8);
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn test_concurrent_first_use_observes_single_pool() {
        let registry = Arc::new(PoolRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.acquire_pool("http://fresh/items", 4))
            })
            .collect();

        let pools: Vec<Arc<EndpointPool>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.len(), 1);
        for pool in &pools {
            assert!(Arc::ptr_eq(pool, &pools[0]));
            assert_eq!(pool.size(), 4);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_submit_respects_pool_size() {
        let registry = PoolRegistry::new();
        let pool = registry.acquire_pool("http://single/items", 1);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_snapshot_sorted() {
        let registry = PoolRegistry::new();
        registry.acquire_pool("http://b/items", 2);
        registry.acquire_pool("http://a/items", 1);
        let snapshot = registry.snapshot();
        assert_eq!(
            snapshot,
            vec![
                PoolStats {
                    url: "http://a/items".to_string(),
                    size: 1,
                    in_flight: 0
                },
                PoolStats {
                    url: "http://b/items".to_string(),
                    size: 2,
                    in_flight: 0
                },
            ]
        );
    }
}
