//! Self-action marker.
//!
//! Mutations the engine performs on a member (quarantine, restore, reverting a
//! role change) echo back as member-update events. The marker records that a
//! member is being changed by the engine so those echoes are not mistaken for
//! privileged changes by someone else.

use rxt_core::MemberKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Reference-counted set of members currently mutated by the engine.
///
/// Marks are counted so overlapping operations on the same member do not clear
/// each other's marks early.
#[derive(Debug, Clone, Default)]
pub struct SelfActionMarker {
    marks: Arc<Mutex<HashMap<MemberKey, usize>>>,
}

impl SelfActionMarker {
    /// Create an empty marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as being changed by the engine.
    pub fn mark(&self, key: MemberKey) {
        let mut marks = self.lock();
        *marks.entry(key).or_insert(0) += 1;
        debug!(member = %key, "Self-action mark set");
    }

    /// Drop one mark for `key`.
    pub fn unmark(&self, key: MemberKey) {
        let mut marks = self.lock();
        if let Some(count) = marks.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                marks.remove(&key);
                debug!(member = %key, "Self-action mark cleared");
            }
        }
    }

    /// Drop one mark for `key` once `grace` has elapsed.
    ///
    /// Platform echoes arrive after the API call returns, so marks outlive the
    /// mutation by a short grace period.
    pub fn release_after(&self, key: MemberKey, grace: Duration) {
        if grace.is_zero() {
            self.unmark(key);
            return;
        }
        let marker = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            marker.unmark(key);
        });
    }

    /// Whether the engine is currently changing `key`.
    pub fn is_marked(&self, key: MemberKey) -> bool {
        self.lock().contains_key(&key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MemberKey, usize>> {
        self.marks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
