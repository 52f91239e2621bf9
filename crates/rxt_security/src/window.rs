//! Sliding-window event counters.
//!
//! Each key owns a queue of event instants. Observing an event prunes entries
//! older than the window, appends the new instant and reports how many events
//! remain inside the window. [`SlidingWindow::observe_crossing`] also checks a
//! threshold and clears the key under the same lock once it is exceeded, so
//! the next violation needs a fresh burst and concurrent observers of one
//! burst see the crossing exactly once.
//!
//! Instants may arrive out of order; a count always covers exactly the
//! recorded instants inside `[now - window, ..]`.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Observations between sweeps of idle keys.
const SWEEP_INTERVAL: u64 = 1024;

#[derive(Debug, Default)]
struct WindowState<K> {
    events: HashMap<K, VecDeque<Instant>>,
    observations: u64,
}

/// Per-key sliding window of event instants.
///
/// # Examples
///
/// ```
/// use rxt_security::SlidingWindow;
/// use std::time::{Duration, Instant};
///
/// let window = SlidingWindow::new();
/// let now = Instant::now();
/// let span = Duration::from_secs(5);
/// assert_eq!(window.observe("alice", now, span), 1);
/// assert_eq!(window.observe("alice", now, span), 2);
/// window.clear(&"alice");
/// assert_eq!(window.count(&"alice", now, span), 0);
/// ```
#[derive(Debug)]
pub struct SlidingWindow<K> {
    state: Mutex<WindowState<K>>,
}

impl<K> Default for SlidingWindow<K> {
    fn default() -> Self {
        Self {
            state: Mutex::new(WindowState {
                events: HashMap::new(),
                observations: 0,
            }),
        }
    }
}

impl<K> SlidingWindow<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event for `key` at `now` and return the in-window count.
    pub fn observe(&self, key: K, now: Instant, window: Duration) -> usize {
        self.observe_many(key, now, window, 1)
    }

    /// Record `n` simultaneous events for `key` and return the in-window count.
    pub fn observe_many(&self, key: K, now: Instant, window: Duration, n: usize) -> usize {
        let mut state = self.lock();
        record(&mut state, key, now, window, n)
    }

    /// Record one event and report the count if it exceeds `threshold`.
    ///
    /// A crossing clears the key before the lock is released.
    pub fn observe_crossing(
        &self,
        key: K,
        now: Instant,
        window: Duration,
        threshold: usize,
    ) -> Option<usize> {
        self.observe_many_crossing(key, now, window, 1, threshold)
    }

    /// Record `n` simultaneous events and report the count if it exceeds `threshold`.
    pub fn observe_many_crossing(
        &self,
        key: K,
        now: Instant,
        window: Duration,
        n: usize,
        threshold: usize,
    ) -> Option<usize> {
        let mut state = self.lock();
        let count = record(&mut state, key.clone(), now, window, n);
        if count > threshold {
            state.events.remove(&key);
            Some(count)
        } else {
            None
        }
    }

    /// Events for `key` still inside the window, without recording a new one.
    pub fn count(&self, key: &K, now: Instant, window: Duration) -> usize {
        let mut state = self.lock();
        let Some(events) = state.events.get_mut(key) else {
            return 0;
        };
        prune(events, now, window);
        let len = events.len();
        if len == 0 {
            state.events.remove(key);
        }
        len
    }

    /// Forget every event recorded for `key`.
    pub fn clear(&self, key: &K) {
        self.lock().events.remove(key);
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().events.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WindowState<K>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn record<K: Eq + Hash>(
    state: &mut WindowState<K>,
    key: K,
    now: Instant,
    window: Duration,
    n: usize,
) -> usize {
    state.observations += 1;
    if state.observations % SWEEP_INTERVAL == 0 {
        sweep(&mut state.events, now, window);
    }

    let events = state.events.entry(key).or_default();
    prune(events, now, window);
    let at = events.partition_point(|t| *t <= now);
    for _ in 0..n {
        events.insert(at, now);
    }
    events.len()
}

/// Drop instants older than the window. The queue is kept sorted, but a
/// late observation can carry an older `now` than the newest entry.
fn prune(events: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    let Some(cutoff) = now.checked_sub(window) else {
        return;
    };
    let stale = events.partition_point(|t| *t < cutoff);
    events.drain(..stale);
}

fn sweep<K: Eq + Hash>(events: &mut HashMap<K, VecDeque<Instant>>, now: Instant, window: Duration) {
    let before = events.len();
    events.retain(|_, queue| {
        prune(queue, now, window);
        !queue.is_empty()
    });
    debug!(removed = before - events.len(), "Swept idle window keys");
}
