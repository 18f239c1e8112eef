//! Shared cache and waiting list for filter queries.
//!
//! Layers bound to the same service tend to ask the same questions at the
//! same time (several filter widgets loading unique values on startup). The
//! coordinator guarantees at most one computation per [`DedupKey`] is in
//! flight; every other caller for that key is parked on the waiting list and
//! receives the same result.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher A ─┐
//!               │                             spawned
//! Dispatcher B ─┼──► QueryCoordinator ──────► thunk()
//!               │      │        │                │
//! Dispatcher C ─┘      │        ▼                │
//!                      │   waiting list ◄────────┘ complete()
//!                      ▼        │
//!                    cache ◄────┘ (success only)
//! ```
//!
//! Successful results are cached for the session; errors are delivered to
//! every waiter and never cached, so the next call computes again.

mod key;

pub use key::DedupKey;

use crate::error::FilterError;
use crate::interface::QueryOutput;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// What every waiter receives.
pub type Outcome = Result<Arc<QueryOutput>, FilterError>;

type Waiter = Box<dyn FnOnce(Outcome) + Send>;

/// How a call to [`QueryCoordinator::execute_deduplicated`] was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Answered synchronously from the cache.
    CacheHit,
    /// Parked behind an in-flight computation.
    Coalesced,
    /// Started a new computation.
    Started,
}

/// Statistics for monitoring deduplication effectiveness.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Total calls received
    pub total_requests: u64,
    /// Calls answered from the cache
    pub cache_hits: u64,
    /// Calls that waited for an in-flight computation
    pub coalesced_requests: u64,
    /// Computations started
    pub executions: u64,
    /// Computations that ended in an error
    pub failures: u64,
}

impl CoordinatorStats {
    /// Share of calls that did not start a computation (0.0 to 1.0).
    pub fn dedup_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.cache_hits + self.coalesced_requests) as f64 / self.total_requests as f64
        }
    }
}

/// Process-wide cache plus waiting list.
///
/// Both maps are written only by the coordinator. Callbacks always run after
/// map guards are released.
pub struct QueryCoordinator {
    cache: DashMap<DedupKey, Arc<QueryOutput>>,
    waiting: DashMap<DedupKey, Mutex<Vec<Waiter>>>,
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    coalesced_requests: AtomicU64,
    executions: AtomicU64,
    failures: AtomicU64,
}

impl QueryCoordinator {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
            waiting: DashMap::new(),
            total_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            coalesced_requests: AtomicU64::new(0),
            executions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Serves `key` from the cache, parks `on_complete` behind an in-flight
    /// computation, or invokes `thunk` and spawns its future.
    ///
    /// A cache hit calls `on_complete` before returning. Otherwise it is
    /// called from the runtime once the computation finishes; waiters are
    /// notified in registration order. A panicking computation is reported
    /// to every waiter as [`FilterError::Internal`].
    ///
    /// Must be called within a tokio runtime.
    pub fn execute_deduplicated<F, Fut, C>(
        self: &Arc<Self>,
        key: DedupKey,
        thunk: F,
        on_complete: C,
    ) -> Dispatch
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryOutput, FilterError>> + Send + 'static,
        C: FnOnce(Outcome) + Send + 'static,
    {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if let Some(output) = self.cached(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Query served from cache");
            on_complete(Ok(output));
            return Dispatch::CacheHit;
        }

        match self.waiting.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let waiters = entry.get_mut().get_mut();
                waiters.push(Box::new(on_complete));
                let count = waiters.len();
                self.coalesced_requests.fetch_add(1, Ordering::Relaxed);
                debug!(
                    key = %key,
                    waiters = count,
                    "Coalescing query - waiting for in-flight computation"
                );
                return Dispatch::Coalesced;
            }
            Entry::Vacant(entry) => {
                // A completion may have landed between the cache miss and here
                if let Some(output) = self.cache.get(&key).map(|e| Arc::clone(e.value())) {
                    drop(entry);
                    self.cache_hits.fetch_add(1, Ordering::Relaxed);
                    on_complete(Ok(output));
                    return Dispatch::CacheHit;
                }
                let waiter: Waiter = Box::new(on_complete);
                entry.insert(Mutex::new(vec![waiter]));
            }
        }

        self.executions.fetch_add(1, Ordering::Relaxed);
        debug!(
            key = %key,
            in_flight = self.waiting.len(),
            "New query - starting computation"
        );
        self.start(key, thunk);
        Dispatch::Started
    }

    fn start<F, Fut>(self: &Arc<Self>, key: DedupKey, thunk: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryOutput, FilterError>> + Send + 'static,
    {
        let future = match std::panic::catch_unwind(AssertUnwindSafe(thunk)) {
            Ok(future) => future,
            Err(_) => {
                self.complete(key, Err(panicked()));
                return;
            }
        };

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                self.complete(
                    key,
                    Err(FilterError::Internal("no async runtime available".to_string())),
                );
                return;
            }
        };

        let coordinator = Arc::clone(self);
        handle.spawn(async move {
            let result = AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(panicked()));
            coordinator.complete(key, result);
        });
    }

    /// Caches a success, then flushes the waiting list in FIFO order.
    fn complete(&self, key: DedupKey, result: Result<QueryOutput, FilterError>) {
        let outcome = result.map(Arc::new);

        match &outcome {
            Ok(output) => {
                self.cache.insert(key.clone(), Arc::clone(output));
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %e, "Query failed");
            }
        }

        let waiters = self
            .waiting
            .remove(&key)
            .map(|(_, waiters)| waiters.into_inner())
            .unwrap_or_default();

        if waiters.len() > 1 {
            debug!(
                key = %key,
                waiters = waiters.len(),
                "Delivering result to {} waiters",
                waiters.len()
            );
        }

        for waiter in waiters {
            waiter(outcome.clone());
        }
    }

    /// Async form of [`execute_deduplicated`](Self::execute_deduplicated).
    ///
    /// Dropping the returned future only stops listening; the computation
    /// still completes and fills the cache.
    pub async fn execute<F, Fut>(self: &Arc<Self>, key: DedupKey, thunk: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryOutput, FilterError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.execute_deduplicated(key, thunk, move |outcome| {
            let _ = tx.send(outcome);
        });
        rx.await.unwrap_or_else(|_| {
            Err(FilterError::Internal(
                "computation ended without a result".to_string(),
            ))
        })
    }

    /// Returns the cached result for `key`, if any.
    pub fn cached(&self, key: &DedupKey) -> Option<Arc<QueryOutput>> {
        self.cache.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns true while a computation for `key` is in flight.
    pub fn is_pending(&self, key: &DedupKey) -> bool {
        self.waiting.contains_key(key)
    }

    /// Number of cached results.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of in-flight computations.
    pub fn pending_count(&self) -> usize {
        self.waiting.len()
    }

    /// Drops every cached result. In-flight computations are unaffected.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            coalesced_requests: self.coalesced_requests.load(Ordering::Relaxed),
            executions: self.executions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();

        info!(
            total_requests = stats.total_requests,
            cache_hits = stats.cache_hits,
            coalesced = stats.coalesced_requests,
            executions = stats.executions,
            failures = stats.failures,
            cached = self.cache_len(),
            in_flight = self.pending_count(),
            dedup_ratio = format!("{:.1}%", stats.dedup_ratio() * 100.0),
            "Query coordinator statistics"
        );
    }
}

impl Default for QueryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn panicked() -> FilterError {
    FilterError::Internal("query computation panicked".to_string())
}
