//! Deduplicated periodic refresh tasks.
//!
//! Filter widgets bound to live layers refresh their values periodically.
//! When several widgets ask for the same refresh under the same identifier,
//! only one timer may run. The [`IntervalRegister`] keeps at most one live
//! registration per key and hands the existing handle back to later callers.
//!
//! Timers behave like browser intervals: the first tick fires one period
//! after registration, not immediately. A timer that stops for any reason
//! drops its own registration, and the register stays usable after
//! [`IntervalRegister::shutdown`].

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Shortest period a timer may run at.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a live periodic task.
#[derive(Debug, Clone)]
pub struct IntervalHandle {
    id: u64,
    key: String,
    period: Duration,
    token: CancellationToken,
}

impl IntervalHandle {
    /// Unique per registration; two handles with the same id share a timer.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stops the timer. The key may then be registered again.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Register of periodic tasks keyed by caller identifier.
pub struct IntervalRegister {
    registrations: Arc<DashMap<String, IntervalHandle>>,
    /// Parent of every timer token; replaced on shutdown.
    root: Mutex<CancellationToken>,
    next_id: AtomicU64,
}

impl IntervalRegister {
    pub fn new() -> Self {
        Self {
            registrations: Arc::new(DashMap::new()),
            root: Mutex::new(CancellationToken::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Starts `task` every `period` under `key`.
    ///
    /// If a live registration for `key` exists, its handle is returned and
    /// `task` is dropped without running. Periods below [`MIN_PERIOD`] are
    /// clamped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn register<F>(&self, key: impl Into<String>, period: Duration, task: F) -> IntervalHandle
    where
        F: FnMut() + Send + 'static,
    {
        let key = key.into();

        match self.registrations.entry(key.clone()) {
            Entry::Occupied(entry) if !entry.get().is_cancelled() => {
                debug!(key = %key, "Interval already registered");
                entry.get().clone()
            }
            entry => {
                let handle = IntervalHandle {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    key: key.clone(),
                    period: period.max(MIN_PERIOD),
                    token: self.root.lock().child_token(),
                };
                spawn_timer(handle.clone(), Arc::clone(&self.registrations), task);
                debug!(
                    key = %key,
                    period_ms = handle.period.as_millis() as u64,
                    "Interval registered"
                );
                entry.insert(handle.clone());
                handle
            }
        }
    }

    /// Stops and removes the timer for `key`; returns true if one was live.
    pub fn unregister(&self, key: &str) -> bool {
        match self.registrations.remove(key) {
            Some((_, handle)) => {
                let was_live = !handle.is_cancelled();
                handle.cancel();
                debug!(key = key, "Interval unregistered");
                was_live
            }
            None => false,
        }
    }

    /// Returns true if a live timer runs under `key`.
    pub fn is_registered(&self, key: &str) -> bool {
        self.registrations
            .get(key)
            .is_some_and(|handle| !handle.is_cancelled())
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.registrations
            .iter()
            .filter(|entry| !entry.value().is_cancelled())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops every timer and clears the register.
    ///
    /// Later registrations start fresh timers.
    pub fn shutdown(&self) {
        info!(timers = self.len(), "Interval register shutting down");
        let old = std::mem::replace(&mut *self.root.lock(), CancellationToken::new());
        old.cancel();
        self.registrations.clear();
    }
}

impl Default for IntervalRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntervalRegister {
    fn drop(&mut self) {
        self.root.get_mut().cancel();
    }
}

fn spawn_timer<F>(
    handle: IntervalHandle,
    registrations: Arc<DashMap<String, IntervalHandle>>,
    mut task: F,
) where
    F: FnMut() + Send + 'static,
{
    let start = tokio::time::Instant::now() + handle.period;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(start, handle.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = handle.token.cancelled() => {
                    debug!(key = %handle.key, "Interval stopped");
                    break;
                }

                _ = interval.tick() => task(),
            }
        }

        // A newer registration under the same key keeps its entry
        registrations.remove_if(&handle.key, |_, current| current.id == handle.id);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::time::sleep;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let task_count = Arc::clone(&count);
        (count, move || {
            task_count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let register = IntervalRegister::new();
        let (count, task) = counter();

        register.register("refresh", Duration::from_millis(100), task);

        sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_registers_once() {
        let register = IntervalRegister::new();
        let (first_count, first) = counter();
        let (second_count, second) = counter();

        let a = register.register("refresh", Duration::from_millis(100), first);
        let b = register.register("refresh", Duration::from_millis(10), second);

        assert_eq!(a.id(), b.id());
        assert_eq!(b.period(), Duration::from_millis(100));
        assert_eq!(register.len(), 1);

        sleep(Duration::from_millis(250)).await;
        assert_eq!(first_count.load(Ordering::SeqCst), 2);
        assert_eq!(second_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregister_stops_timer() {
        let register = IntervalRegister::new();
        let (count, task) = counter();

        register.register("refresh", Duration::from_millis(100), task);
        sleep(Duration::from_millis(150)).await;
        assert!(register.unregister("refresh"));
        assert!(!register.unregister("refresh"));
        assert!(!register.is_registered("refresh"));

        sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_handle_allows_reregistration() {
        let register = IntervalRegister::new();
        let (_, first) = counter();
        let (count, second) = counter();

        let old = register.register("refresh", Duration::from_millis(100), first);
        old.cancel();
        assert!(!register.is_registered("refresh"));

        let new = register.register("refresh", Duration::from_millis(100), second);
        assert_ne!(old.id(), new.id());

        sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_clamped() {
        let register = IntervalRegister::new();
        let (_, task) = counter();

        let handle = register.register("fast", Duration::ZERO, task);
        assert_eq!(handle.period(), MIN_PERIOD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_everything() {
        let register = IntervalRegister::new();
        let (a_count, a) = counter();
        let (b_count, b) = counter();

        register.register("a", Duration::from_millis(100), a);
        register.register("b", Duration::from_millis(100), b);
        assert_eq!(register.len(), 2);

        register.shutdown();
        assert!(register.is_empty());

        sleep(Duration::from_millis(300)).await;
        assert_eq!(a_count.load(Ordering::SeqCst), 0);
        assert_eq!(b_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_after_shutdown_runs() {
        let register = IntervalRegister::new();
        let (_, before) = counter();
        register.register("refresh", Duration::from_millis(100), before);
        register.shutdown();

        let (count, after) = counter();
        let handle = register.register("refresh", Duration::from_millis(100), after);
        assert!(!handle.is_cancelled());
        assert!(register.is_registered("refresh"));

        sleep(Duration::from_millis(250)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(register.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_leaves_the_register() {
        let register = IntervalRegister::new();
        let (_, task) = counter();

        let handle = register.register("refresh", Duration::from_millis(100), task);
        handle.cancel();
        sleep(Duration::from_millis(10)).await;

        assert!(!register.registrations.contains_key("refresh"));
        assert!(register.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_keeps_newer_registration() {
        let register = IntervalRegister::new();
        let (_, first) = counter();
        let (count, second) = counter();

        let old = register.register("refresh", Duration::from_millis(100), first);
        old.cancel();
        let new = register.register("refresh", Duration::from_millis(100), second);
        sleep(Duration::from_millis(150)).await;

        let current = register.registrations.get("refresh").map(|h| h.id());
        assert_eq!(current, Some(new.id()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
