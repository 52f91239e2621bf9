//! Quarantine records.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use rxt_core::{GuildId, MemberKey, RoleId, UserId, ViolationType};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Roles a member held when first quarantined.
///
/// Created on the first offence and never overwritten by later offences, so a
/// restore always returns the roles the member had before the first violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct RoleSnapshot {
    guild_id: GuildId,
    user_id: UserId,
    role_ids: Vec<RoleId>,
    captured_at: DateTime<Utc>,
}

impl RoleSnapshot {
    /// Capture a snapshot.
    pub fn new(key: MemberKey, role_ids: Vec<RoleId>, captured_at: DateTime<Utc>) -> Self {
        Self {
            guild_id: key.guild_id,
            user_id: key.user_id,
            role_ids,
            captured_at,
        }
    }
}

/// The live state of one quarantine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ViolationRecord {
    violations: u32,
    reason: String,
    violation_type: ViolationType,
    duration_secs: u64,
    quarantined_at: DateTime<Utc>,
    quarantine_until: DateTime<Utc>,
    quarantine_role_id: Option<RoleId>,
    generation: u64,
}

/// A quarantined member: snapshot plus violation record.
///
/// This is the unit persisted by a [`crate::QuarantineStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct QuarantineEntry {
    snapshot: RoleSnapshot,
    record: ViolationRecord,
}

/// Parameters of one offence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Offence {
    pub reason: String,
    pub violation_type: ViolationType,
    pub duration: Duration,
    pub at: DateTime<Utc>,
    pub quarantine_role_id: Option<RoleId>,
    pub generation: u64,
}

impl QuarantineEntry {
    /// Start a quarantine for a first offence.
    pub(crate) fn first(snapshot: RoleSnapshot, offence: Offence) -> Self {
        Self {
            snapshot,
            record: ViolationRecord::from_offence(1, offence),
        }
    }

    /// Record a repeat offence, keeping the original snapshot.
    pub(crate) fn repeat(&self, offence: Offence) -> Self {
        Self {
            snapshot: self.snapshot.clone(),
            record: ViolationRecord::from_offence(self.record.violations.saturating_add(1), offence),
        }
    }

    /// The member this entry belongs to.
    pub fn key(&self) -> MemberKey {
        MemberKey::new(self.snapshot.guild_id, self.snapshot.user_id)
    }

    /// Time left until the scheduled restore, zero if already due.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.record.quarantine_until - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl ViolationRecord {
    fn from_offence(violations: u32, offence: Offence) -> Self {
        let duration_secs = offence.duration.as_secs();
        let span = chrono::Duration::from_std(offence.duration).unwrap_or(chrono::Duration::MAX);
        let quarantine_until = offence
            .at
            .checked_add_signed(span)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            violations,
            reason: offence.reason,
            violation_type: offence.violation_type,
            duration_secs,
            quarantined_at: offence.at,
            quarantine_until,
            quarantine_role_id: offence.quarantine_role_id,
            generation: offence.generation,
        }
    }

    /// Duration of the current quarantine.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Quarantine duration for the `violations`-th offence.
///
/// `max(base, base * violations)`, uncapped and saturating.
///
/// # Examples
///
/// ```
/// use rxt_security::escalated_duration;
/// use std::time::Duration;
///
/// let base = Duration::from_secs(3600);
/// assert_eq!(escalated_duration(base, 1), base);
/// assert_eq!(escalated_duration(base, 3), Duration::from_secs(3 * 3600));
/// assert_eq!(escalated_duration(base, 0), base);
/// ```
pub fn escalated_duration(base: Duration, violations: u32) -> Duration {
    base.saturating_mul(violations).max(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offence(generation: u64, secs: u64) -> Offence {
        Offence {
            reason: "spam".to_string(),
            violation_type: ViolationType::Spam,
            duration: Duration::from_secs(secs),
            at: Utc::now(),
            quarantine_role_id: Some(RoleId::new(9)),
            generation,
        }
    }

    #[test]
    fn test_escalation_is_monotonic_and_uncapped() {
        let base = Duration::from_secs(60);
        let mut previous = Duration::ZERO;
        for v in 1..=50 {
            let d = escalated_duration(base, v);
            assert!(d > previous);
            previous = d;
        }
        assert_eq!(escalated_duration(base, 50), Duration::from_secs(3000));
        assert_eq!(
            escalated_duration(Duration::MAX, 2),
            Duration::MAX,
            "saturates instead of overflowing"
        );
    }

    #[test]
    fn test_repeat_keeps_snapshot_and_counts() {
        let key = MemberKey::new(GuildId::new(1), UserId::new(2));
        let snapshot = RoleSnapshot::new(key, vec![RoleId::new(3), RoleId::new(4)], Utc::now());
        let first = QuarantineEntry::first(snapshot.clone(), offence(1, 60));
        let second = first.repeat(offence(2, 120));

        assert_eq!(second.snapshot(), &snapshot);
        assert_eq!(*second.record().violations(), 2);
        assert_eq!(*second.record().generation(), 2);
        assert_eq!(second.record().duration(), Duration::from_secs(120));
        assert_eq!(second.key(), key);
    }

    #[test]
    fn test_remaining_never_negative() {
        let key = MemberKey::new(GuildId::new(1), UserId::new(2));
        let snapshot = RoleSnapshot::new(key, Vec::new(), Utc::now());
        let entry = QuarantineEntry::first(snapshot, offence(1, 10));
        let later = Utc::now() + chrono::Duration::seconds(60);
        assert_eq!(entry.remaining(later), Duration::ZERO);
    }

    #[test]
    fn test_entry_round_trips_through_json() {
        let key = MemberKey::new(GuildId::new(1), UserId::new(2));
        let snapshot = RoleSnapshot::new(key, vec![RoleId::new(3)], Utc::now());
        let entry = QuarantineEntry::first(snapshot, offence(7, 3600));
        let json = serde_json::to_string(&entry).unwrap();
        let back: QuarantineEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
