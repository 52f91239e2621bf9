//! Quarantine lifecycle: apply, escalate, restore and reconcile.

use super::model::Offence;
use crate::{
    ChannelOverwrite, EngineSettings, GuildPlatform, KeyedLocks, LogSink, OverwriteTarget,
    QuarantineEntry, QuarantineStore, RestoreScheduler, RoleSnapshot, SecurityError,
    SecurityErrorKind, SecurityResult, SelfActionMarker, escalated_duration,
};
use chrono::{DateTime, Utc};
use rxt_config::{ConfigStore, SecurityConfig};
use rxt_core::{
    ChannelId, GuildId, GuildView, LogCategory, MemberKey, MemberView, Permissions, RoleId,
    UserId, ViolationType,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

/// What happened when a member was quarantined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineOutcome {
    /// The quarantined member
    pub user_id: UserId,
    /// Why
    pub violation_type: ViolationType,
    /// Offences in the current quarantine, including this one
    pub violations: u32,
    /// Length of the quarantine just applied
    pub duration: Duration,
    /// When the scheduled restore fires
    pub quarantine_until: DateTime<Utc>,
    /// Roles that will be restored on release
    pub snapshot_roles: Vec<RoleId>,
    /// Whether the member was already quarantined
    pub repeat_offence: bool,
    /// Platform calls that failed; the quarantine was still recorded
    pub failed_actions: Vec<String>,
}

/// What triggered a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreTrigger {
    /// A restore timer fired for the given generation.
    Scheduled {
        /// Generation the timer was armed for
        generation: u64,
    },
    /// An administrator released the member.
    Manual {
        /// Who released the member, if known
        moderator: Option<UserId>,
    },
}

/// Details of a completed restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    /// The released member
    pub user_id: UserId,
    /// Roles given back
    pub roles_restored: Vec<RoleId>,
    /// Snapshot roles that no longer exist
    pub roles_skipped: Vec<RoleId>,
    /// Platform calls that failed; the entry was still cleared
    pub failed_actions: Vec<String>,
}

/// Result of a restore attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The member was released.
    Restored(RestoreReport),
    /// The member had no active quarantine.
    NotQuarantined,
    /// A timer fired for a quarantine that has since been escalated.
    Stale,
}

/// Startup reconcile counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Expired entries restored immediately
    pub restored: usize,
    /// Entries with time left that got a new timer
    pub rescheduled: usize,
    /// Expired entries whose restore returned an error
    pub failed: usize,
}

/// Quarantine role and channel for one guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QuarantineResources {
    role_id: RoleId,
    channel_id: Option<ChannelId>,
}

struct ManagerInner {
    platform: Arc<dyn GuildPlatform>,
    configs: Arc<dyn ConfigStore>,
    store: Arc<dyn QuarantineStore>,
    sink: Arc<dyn LogSink>,
    marker: SelfActionMarker,
    settings: EngineSettings,
    locks: KeyedLocks<MemberKey>,
    resource_locks: KeyedLocks<GuildId>,
    ledger: RwLock<HashMap<MemberKey, QuarantineEntry>>,
    scheduler: RestoreScheduler,
    generation: AtomicU64,
}

/// Owns every quarantine: snapshots, escalation, timers and persistence.
///
/// Operations on one member are serialized; different members proceed in
/// parallel. Cloning is cheap and shares state.
#[derive(Clone)]
pub struct QuarantineManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for QuarantineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuarantineManager")
            .field("settings", &self.inner.settings)
            .field("pending_restores", &self.inner.scheduler.pending())
            .finish_non_exhaustive()
    }
}

impl QuarantineManager {
    /// Create a manager with an empty ledger. Call [`Self::reconcile`] to load
    /// persisted quarantines.
    pub fn new(
        platform: Arc<dyn GuildPlatform>,
        configs: Arc<dyn ConfigStore>,
        store: Arc<dyn QuarantineStore>,
        sink: Arc<dyn LogSink>,
        marker: SelfActionMarker,
        settings: EngineSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                platform,
                configs,
                store,
                sink,
                marker,
                settings,
                locks: KeyedLocks::new(),
                resource_locks: KeyedLocks::new(),
                ledger: RwLock::new(HashMap::new()),
                scheduler: RestoreScheduler::new(),
                generation: AtomicU64::new(1),
            }),
        }
    }

    /// The active quarantine for `key`, if any.
    pub async fn status(&self, key: MemberKey) -> Option<QuarantineEntry> {
        self.inner.ledger.read().await.get(&key).cloned()
    }

    /// Whether `key` is currently quarantined.
    pub async fn is_quarantined(&self, key: MemberKey) -> bool {
        self.inner.ledger.read().await.contains_key(&key)
    }

    /// Every active quarantine in `guild_id`.
    pub async fn active(&self, guild_id: GuildId) -> Vec<QuarantineEntry> {
        let mut entries: Vec<_> = self
            .inner
            .ledger
            .read()
            .await
            .values()
            .filter(|e| e.key().guild_id == guild_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.key());
        entries
    }

    /// Restore timers that have not fired yet.
    pub fn pending_restores(&self) -> usize {
        self.inner.scheduler.pending()
    }

    /// Abort every restore timer. Persisted entries are reconciled on next start.
    pub fn shutdown(&self) {
        self.inner.scheduler.shutdown();
    }

    /// Quarantine `member`, or escalate an existing quarantine.
    ///
    /// On a first offence the member's roles are snapshotted and persisted
    /// before they are stripped. A repeat offence keeps the original snapshot,
    /// bumps the violation count and re-arms the restore timer with the
    /// escalated duration. Individual platform calls that fail are logged and
    /// reported in [`QuarantineOutcome::failed_actions`].
    ///
    /// # Errors
    ///
    /// Fails if the member is the guild owner or the engine itself, if the
    /// guild configuration cannot be read, or if no quarantine role exists and
    /// none can be created.
    #[instrument(
        skip(self, guild, member, reason, violation_type),
        fields(guild_id = %guild.guild_id, user_id = %member.user_id, violation = %violation_type)
    )]
    pub async fn apply_quarantine(
        &self,
        guild: &GuildView,
        member: &MemberView,
        reason: &str,
        violation_type: ViolationType,
    ) -> SecurityResult<QuarantineOutcome> {
        if member.user_id == guild.owner_id || member.user_id == guild.bot_user_id {
            return Err(SecurityError::new(SecurityErrorKind::InvalidTarget {
                target: member.user_id.to_string(),
                reason: "the guild owner and the engine cannot be quarantined".to_string(),
            }));
        }

        let inner = &self.inner;
        let key = MemberKey::new(guild.guild_id, member.user_id);
        let _guard = inner.locks.lock(&key).await;

        let config = inner.configs.get_config(guild.guild_id).await?;
        let resources = self.ensure_resources(guild, &config).await?;
        let managed = self.managed_roles(guild.guild_id).await;
        let strippable: Vec<RoleId> = member
            .role_ids
            .iter()
            .copied()
            .filter(|r| *r != resources.role_id && !managed.contains(r))
            .collect();

        let previous = inner.ledger.read().await.get(&key).cloned();
        let violations = previous
            .as_ref()
            .map_or(1, |p| p.record().violations().saturating_add(1));
        let duration = escalated_duration(config.quarantine_base_duration(), violations);
        let now = Utc::now();
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst);
        let offence = Offence {
            reason: reason.to_string(),
            violation_type,
            duration,
            at: now,
            quarantine_role_id: Some(resources.role_id),
            generation,
        };
        let entry = match &previous {
            Some(previous) => previous.repeat(offence),
            None => QuarantineEntry::first(RoleSnapshot::new(key, strippable.clone(), now), offence),
        };

        let mut failed_actions = Vec::new();
        inner.ledger.write().await.insert(key, entry.clone());
        if let Err(e) = inner.store.save(&entry).await {
            error!(error = %e, "Failed to persist quarantine entry");
            failed_actions.push(format!("persist quarantine entry: {}", e));
        }

        let audit_reason = format!("Quarantine: {}", reason);
        inner.marker.mark(key);
        for role_id in &strippable {
            if let Err(e) = inner
                .platform
                .remove_role(guild.guild_id, member.user_id, *role_id, &audit_reason)
                .await
            {
                if !e.is_not_found() {
                    warn!(role_id = %role_id, error = %e, "Failed to remove role");
                    failed_actions.push(format!("remove role {}: {}", role_id, e));
                }
            }
        }
        if !member.role_ids.contains(&resources.role_id) {
            if let Err(e) = inner
                .platform
                .add_role(guild.guild_id, member.user_id, resources.role_id, &audit_reason)
                .await
            {
                warn!(error = %e, "Failed to add quarantine role");
                failed_actions.push(format!("add quarantine role: {}", e));
            }
        }
        if !duration.is_zero() {
            if let Err(e) = inner
                .platform
                .timeout_member(guild.guild_id, member.user_id, *entry.record().quarantine_until())
                .await
            {
                warn!(error = %e, "Failed to apply timeout");
                failed_actions.push(format!("timeout: {}", e));
            }
        }
        inner.marker.release_after(key, *inner.settings.self_action_grace());

        self.schedule_restore(key, duration, generation);

        let outcome = QuarantineOutcome {
            user_id: member.user_id,
            violation_type,
            violations,
            duration,
            quarantine_until: *entry.record().quarantine_until(),
            snapshot_roles: entry.snapshot().role_ids().clone(),
            repeat_offence: previous.is_some(),
            failed_actions,
        };
        self.announce_quarantine(guild.guild_id, resources.channel_id, reason, &outcome)
            .await;

        info!(
            violations,
            duration_secs = duration.as_secs(),
            repeat = outcome.repeat_offence,
            "Member quarantined"
        );
        Ok(outcome)
    }

    /// Release `key`: lift the quarantine and give back the snapshot roles.
    ///
    /// Restoring a member with no active quarantine is a no-op, so a timer
    /// racing a manual release is harmless. A scheduled restore whose
    /// generation no longer matches the entry is ignored: the quarantine was
    /// escalated and a newer timer owns it.
    ///
    /// # Errors
    ///
    /// Restores are best-effort and only fail if the ledger cannot be read.
    #[instrument(skip(self), fields(member = %key))]
    pub async fn restore(
        &self,
        key: MemberKey,
        trigger: RestoreTrigger,
    ) -> SecurityResult<RestoreOutcome> {
        let inner = &self.inner;
        let _guard = inner.locks.lock(&key).await;

        let Some(entry) = inner.ledger.read().await.get(&key).cloned() else {
            debug!("No active quarantine");
            return Ok(RestoreOutcome::NotQuarantined);
        };
        match trigger {
            RestoreTrigger::Scheduled { generation } if generation != *entry.record().generation() => {
                debug!(
                    timer = generation,
                    current = entry.record().generation(),
                    "Stale restore timer"
                );
                return Ok(RestoreOutcome::Stale);
            }
            RestoreTrigger::Manual { .. } => inner.scheduler.cancel(key),
            RestoreTrigger::Scheduled { .. } => {}
        }

        let guild_id = key.guild_id;
        let user_id = key.user_id;
        let mut failed_actions = Vec::new();
        let audit_reason = match trigger {
            RestoreTrigger::Scheduled { .. } => "Quarantine expired".to_string(),
            RestoreTrigger::Manual { moderator: Some(m) } => format!("Released by {}", m),
            RestoreTrigger::Manual { moderator: None } => "Released manually".to_string(),
        };

        inner.marker.mark(key);
        if let Some(role_id) = *entry.record().quarantine_role_id() {
            if let Err(e) = inner
                .platform
                .remove_role(guild_id, user_id, role_id, &audit_reason)
                .await
            {
                if !e.is_not_found() {
                    warn!(error = %e, "Failed to remove quarantine role");
                    failed_actions.push(format!("remove quarantine role: {}", e));
                }
            }
        }
        if let Err(e) = inner.platform.clear_timeout(guild_id, user_id).await {
            if !e.is_not_found() {
                warn!(error = %e, "Failed to clear timeout");
                failed_actions.push(format!("clear timeout: {}", e));
            }
        }

        let existing: Option<HashSet<RoleId>> = match inner.platform.roles(guild_id).await {
            Ok(roles) => Some(roles.into_iter().map(|r| r.id).collect()),
            Err(e) => {
                debug!(error = %e, "Role list unavailable, attempting every snapshot role");
                None
            }
        };
        let mut roles_restored = Vec::new();
        let mut roles_skipped = Vec::new();
        for role_id in entry.snapshot().role_ids() {
            if existing.as_ref().is_some_and(|set| !set.contains(role_id)) {
                debug!(role_id = %role_id, "Snapshot role no longer exists");
                roles_skipped.push(*role_id);
                continue;
            }
            match inner
                .platform
                .add_role(guild_id, user_id, *role_id, &audit_reason)
                .await
            {
                Ok(()) => roles_restored.push(*role_id),
                Err(e) if e.is_not_found() => roles_skipped.push(*role_id),
                Err(e) => {
                    warn!(role_id = %role_id, error = %e, "Failed to restore role");
                    failed_actions.push(format!("restore role {}: {}", role_id, e));
                }
            }
        }
        inner.marker.release_after(key, *inner.settings.self_action_grace());

        inner.ledger.write().await.remove(&key);
        if let Err(e) = inner.store.remove(key).await {
            error!(error = %e, "Failed to delete persisted quarantine entry");
            failed_actions.push(format!("persist release: {}", e));
        }

        let report = RestoreReport {
            user_id,
            roles_restored,
            roles_skipped,
            failed_actions,
        };
        self.announce_restore(guild_id, trigger, &report).await;
        info!(
            restored = report.roles_restored.len(),
            skipped = report.roles_skipped.len(),
            failed = report.failed_actions.len(),
            "Member released"
        );
        Ok(RestoreOutcome::Restored(report))
    }

    /// Release `key` on an administrator's request.
    ///
    /// # Errors
    ///
    /// Returns `NotQuarantined` if the member has no active quarantine.
    pub async fn remove_quarantine_manual(
        &self,
        key: MemberKey,
        moderator: Option<UserId>,
    ) -> SecurityResult<RestoreReport> {
        match self.restore(key, RestoreTrigger::Manual { moderator }).await? {
            RestoreOutcome::Restored(report) => Ok(report),
            RestoreOutcome::NotQuarantined | RestoreOutcome::Stale => Err(SecurityError::new(
                SecurityErrorKind::NotQuarantined(key.to_string()),
            )),
        }
    }

    /// Load persisted quarantines, restore the expired ones and re-arm timers
    /// for the rest. Run once at startup.
    ///
    /// # Errors
    ///
    /// Fails only if the store cannot be read; individual restore failures are
    /// counted in the report.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> SecurityResult<ReconcileReport> {
        let entries = self.inner.store.load_all().await?;
        let max_generation = entries
            .iter()
            .map(|e| *e.record().generation())
            .max()
            .unwrap_or(0);
        self.inner
            .generation
            .fetch_max(max_generation.saturating_add(1), Ordering::SeqCst);

        {
            let mut ledger = self.inner.ledger.write().await;
            for entry in &entries {
                ledger.entry(entry.key()).or_insert_with(|| entry.clone());
            }
        }

        let now = Utc::now();
        let mut report = ReconcileReport::default();
        for entry in entries {
            let key = entry.key();
            let generation = *entry.record().generation();
            let remaining = entry.remaining(now);
            if remaining.is_zero() {
                match self.restore(key, RestoreTrigger::Scheduled { generation }).await {
                    Ok(RestoreOutcome::Restored(_)) => report.restored += 1,
                    Ok(_) => {}
                    Err(e) => {
                        error!(member = %key, error = %e, "Startup restore failed");
                        report.failed += 1;
                    }
                }
            } else {
                self.schedule_restore(key, remaining, generation);
                report.rescheduled += 1;
            }
        }

        info!(
            restored = report.restored,
            rescheduled = report.rescheduled,
            failed = report.failed,
            "Quarantine ledger reconciled"
        );
        Ok(report)
    }

    fn schedule_restore(&self, key: MemberKey, delay: Duration, generation: u64) {
        let manager = self.clone();
        self.inner.scheduler.schedule(key, delay, async move {
            match manager
                .restore(key, RestoreTrigger::Scheduled { generation })
                .await
            {
                Ok(outcome) => debug!(member = %key, ?outcome, "Scheduled restore finished"),
                Err(e) => error!(member = %key, error = %e, "Scheduled restore failed"),
            }
        });
    }

    async fn managed_roles(&self, guild_id: GuildId) -> HashSet<RoleId> {
        match self.inner.platform.roles(guild_id).await {
            Ok(roles) => roles.into_iter().filter(|r| r.managed).map(|r| r.id).collect(),
            Err(e) => {
                debug!(error = %e, "Role list unavailable, treating every role as assignable");
                HashSet::new()
            }
        }
    }

    /// Make sure the quarantine role and channel exist, creating and caching
    /// them in the guild configuration when missing.
    #[instrument(skip(self, guild, config), fields(guild_id = %guild.guild_id))]
    async fn ensure_resources(
        &self,
        guild: &GuildView,
        config: &SecurityConfig,
    ) -> SecurityResult<QuarantineResources> {
        let inner = &self.inner;
        let guild_id = guild.guild_id;
        let _guard = inner.resource_locks.lock(&guild_id).await;

        // Another member's quarantine may have created the resources while we waited.
        let config = match inner.configs.get_config(guild_id).await {
            Ok(fresh) => fresh,
            Err(_) => config.clone(),
        };
        let naming = inner.settings.naming();

        let role_exists = match (config.quarantine_role_id, inner.platform.roles(guild_id).await) {
            (Some(id), Ok(roles)) => roles.iter().any(|r| r.id == id),
            (Some(_), Err(_)) => true,
            (None, _) => false,
        };
        let (role_id, role_created) = match config.quarantine_role_id {
            Some(id) if role_exists => (id, false),
            _ => {
                let id = inner
                    .platform
                    .create_role(guild_id, naming.role_name(), Permissions::default())
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Cannot create quarantine role");
                        SecurityError::new(SecurityErrorKind::Configuration(format!(
                            "quarantine role unavailable: {}",
                            e
                        )))
                    })?;
                info!(role_id = %id, "Quarantine role created");
                (id, true)
            }
        };

        let channels: Option<HashSet<ChannelId>> = match inner.platform.channel_ids(guild_id).await {
            Ok(ids) => Some(ids.into_iter().collect()),
            Err(e) => {
                debug!(error = %e, "Channel list unavailable, trusting cached IDs");
                None
            }
        };
        let exists = |id: Option<ChannelId>| match (id, &channels) {
            (Some(id), Some(set)) => set.contains(&id),
            (Some(_), None) => true,
            (None, _) => false,
        };

        let overwrites = quarantine_overwrites(role_id, guild.bot_user_id);
        let category_id = if exists(config.quarantine_category_id) {
            config.quarantine_category_id
        } else {
            match inner
                .platform
                .create_category(guild_id, naming.category_name(), overwrites.clone())
                .await
            {
                Ok(id) => {
                    info!(channel_id = %id, "Quarantine category created");
                    Some(id)
                }
                Err(e) => {
                    warn!(error = %e, "Cannot create quarantine category");
                    None
                }
            }
        };
        let channel_id = if exists(config.quarantine_channel_id) {
            config.quarantine_channel_id
        } else {
            match inner
                .platform
                .create_text_channel(guild_id, naming.channel_name(), category_id, overwrites)
                .await
            {
                Ok(id) => {
                    info!(channel_id = %id, "Quarantine channel created");
                    Some(id)
                }
                Err(e) => {
                    warn!(error = %e, "Cannot create quarantine channel");
                    None
                }
            }
        };

        if role_created {
            let skip = [category_id, channel_id];
            self.isolate_role(guild_id, role_id, channels.iter().flatten(), &skip)
                .await;
        }

        if config.quarantine_role_id != Some(role_id)
            || config.quarantine_category_id != category_id
            || config.quarantine_channel_id != channel_id
        {
            inner
                .configs
                .update_config(
                    guild_id,
                    Box::new(move |c| {
                        c.quarantine_role_id = Some(role_id);
                        c.quarantine_category_id = category_id;
                        c.quarantine_channel_id = channel_id;
                    }),
                )
                .await?;
            debug!("Quarantine resource IDs cached");
        }

        Ok(QuarantineResources {
            role_id,
            channel_id,
        })
    }

    /// Hide every other channel from the quarantine role.
    async fn isolate_role<'a>(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
        channels: impl Iterator<Item = &'a ChannelId>,
        skip: &[Option<ChannelId>],
    ) {
        let deny = Permissions::from_bits(
            Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::ADD_REACTIONS,
        );
        let overwrite = ChannelOverwrite::new(
            OverwriteTarget::Role(role_id),
            Permissions::default(),
            deny,
        );
        let mut failed = 0usize;
        for channel_id in channels.filter(|c| !skip.contains(&Some(**c))) {
            if let Err(e) = self
                .inner
                .platform
                .set_channel_overwrite(guild_id, *channel_id, overwrite)
                .await
            {
                debug!(channel_id = %channel_id, error = %e, "Failed to isolate channel");
                failed += 1;
            }
        }
        if failed > 0 {
            warn!(failed, "Quarantine role not isolated from every channel");
        }
    }

    async fn announce_quarantine(
        &self,
        guild_id: GuildId,
        channel_id: Option<ChannelId>,
        reason: &str,
        outcome: &QuarantineOutcome,
    ) {
        let inner = &self.inner;
        let length = format_duration(outcome.duration);

        if let Some(channel_id) = channel_id {
            let notice = format!(
                "<@{}> you have been quarantined for {}. Reason: {}",
                outcome.user_id, length, reason
            );
            if let Err(e) = inner.platform.send_message(channel_id, &notice).await {
                debug!(error = %e, "Quarantine notice not delivered");
            }
        }
        if *inner.settings.dm_notifications() {
            let dm = format!(
                "You have been quarantined for {}. Reason: {}. Your roles will be restored when it ends.",
                length, reason
            );
            if let Err(e) = inner.platform.send_direct_message(outcome.user_id, &dm).await {
                debug!(error = %e, "Quarantine DM not delivered");
            }
        }

        let mut line = format!(
            "Quarantined <@{}> for {} ({}, violation #{}): {}",
            outcome.user_id, length, outcome.violation_type, outcome.violations, reason
        );
        if !outcome.failed_actions.is_empty() {
            line.push_str(&format!(" [failed: {}]", outcome.failed_actions.join("; ")));
        }
        inner
            .sink
            .log_action(guild_id, LogCategory::QuarantineApplied, &line)
            .await;
    }

    async fn announce_restore(&self, guild_id: GuildId, trigger: RestoreTrigger, report: &RestoreReport) {
        let inner = &self.inner;
        let how = match trigger {
            RestoreTrigger::Scheduled { .. } => "quarantine expired".to_string(),
            RestoreTrigger::Manual { moderator: Some(m) } => format!("released by <@{}>", m),
            RestoreTrigger::Manual { moderator: None } => "released manually".to_string(),
        };
        let mut line = format!(
            "Restored <@{}> ({}): {} roles restored, {} skipped",
            report.user_id,
            how,
            report.roles_restored.len(),
            report.roles_skipped.len()
        );
        if !report.failed_actions.is_empty() {
            line.push_str(&format!(" [failed: {}]", report.failed_actions.join("; ")));
        }
        inner
            .sink
            .log_action(guild_id, LogCategory::QuarantineRestored, &line)
            .await;

        if *inner.settings.dm_notifications() {
            let dm = "Your quarantine has ended and your roles have been restored.";
            if let Err(e) = inner.platform.send_direct_message(report.user_id, dm).await {
                debug!(error = %e, "Release DM not delivered");
            }
        }
    }
}

/// Overwrites for the quarantine category and channel: hidden from everyone,
/// visible to the quarantine role and the engine.
fn quarantine_overwrites(role_id: RoleId, bot_user_id: UserId) -> Vec<ChannelOverwrite> {
    vec![
        ChannelOverwrite::new(
            OverwriteTarget::Everyone,
            Permissions::default(),
            Permissions::from_bits(Permissions::VIEW_CHANNEL),
        ),
        ChannelOverwrite::new(
            OverwriteTarget::Role(role_id),
            Permissions::from_bits(Permissions::QUARANTINE_ALLOW),
            Permissions::from_bits(Permissions::QUARANTINE_DENY),
        ),
        ChannelOverwrite::new(
            OverwriteTarget::Member(bot_user_id),
            Permissions::from_bits(
                Permissions::VIEW_CHANNEL
                    | Permissions::SEND_MESSAGES
                    | Permissions::READ_MESSAGE_HISTORY
                    | Permissions::MANAGE_MESSAGES,
            ),
            Permissions::default(),
        ),
    ]
}

/// Compact human duration, e.g. `2h 30m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        return "0s".to_string();
    }
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        secs % 86_400 / 3600,
        secs % 3600 / 60,
        secs % 60,
    );
    [(days, "d"), (hours, "h"), (minutes, "m"), (seconds, "s")]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{}{}", n, unit))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(9000)), "2h 30m");
        assert_eq!(format_duration(Duration::from_secs(90_061)), "1d 1h 1m 1s");
    }

    #[test]
    fn test_quarantine_overwrites_hide_channel_from_everyone() {
        let overwrites = quarantine_overwrites(RoleId::new(5), UserId::new(9));
        assert_eq!(overwrites[0].target, OverwriteTarget::Everyone);
        assert!(overwrites[0].deny.contains(Permissions::VIEW_CHANNEL));
        assert!(overwrites[1].allow.contains(Permissions::SEND_MESSAGES));
        assert_eq!(overwrites[2].target, OverwriteTarget::Member(UserId::new(9)));
    }
}
