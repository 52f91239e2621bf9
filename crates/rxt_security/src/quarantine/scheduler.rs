//! Fire-once restore timers.

use rxt_core::MemberKey;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

/// Spawns one delayed task per member.
///
/// Scheduling for a member that already has a pending timer replaces it and
/// aborts the old one. Timers that already woke up are not affected by the
/// abort; the restore they run checks the entry generation instead.
#[derive(Debug, Clone, Default)]
pub struct RestoreScheduler {
    tasks: Arc<Mutex<HashMap<MemberKey, JoinHandle<()>>>>,
}

impl RestoreScheduler {
    /// Create a scheduler with no pending timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once after `delay`.
    #[instrument(skip(self, task), fields(member = %key))]
    pub fn schedule<F>(&self, key: MemberKey, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(?delay, "Scheduling restore");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        let mut tasks = self.lock();
        tasks.retain(|_, h| !h.is_finished());
        if let Some(old) = tasks.insert(key, handle) {
            debug!("Replacing pending restore");
            old.abort();
        }
    }

    /// Abort the pending timer for `key`, if any.
    pub fn cancel(&self, key: MemberKey) {
        if let Some(handle) = self.lock().remove(&key) {
            handle.abort();
            debug!(member = %key, "Restore timer canceled");
        }
    }

    /// Whether `key` has a timer that has not fired yet.
    pub fn is_pending(&self, key: MemberKey) -> bool {
        self.lock().get(&key).is_some_and(|h| !h.is_finished())
    }

    /// Number of timers that have not fired yet.
    pub fn pending(&self) -> usize {
        self.lock().values().filter(|h| !h.is_finished()).count()
    }

    /// Abort every pending timer.
    pub fn shutdown(&self) {
        for (_, handle) in self.lock().drain() {
            handle.abort();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MemberKey, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxt_core::{GuildId, UserId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key() -> MemberKey {
        MemberKey::new(GuildId::new(1), UserId::new(2))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let scheduler = RestoreScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        scheduler.schedule(key(), Duration::from_secs(60), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_pending(key()));

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending(key()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_timer() {
        let scheduler = RestoreScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        for delay in [10, 20] {
            let counter = fired.clone();
            scheduler.schedule(key(), Duration::from_secs(delay), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let scheduler = RestoreScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        scheduler.schedule(key(), Duration::from_secs(5), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.cancel(key());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 0);
    }
}
