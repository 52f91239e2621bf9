//! Event dispatch: one handler per gateway event type.
//!
//! Every handler reads the guild configuration fresh, checks the whitelist
//! before any detector, and answers with a [`Verdict`]. Platform failures that
//! do not prevent a decision are logged and degrade to best effort.

use crate::{
    ActorResolution, AuditEvidence, ChannelDeleteEvent, EjectionReason, EngineSettings,
    GuildPlatform, JoinEvent, LinkDetector, LogSink, MemberUpdateEvent, MessageDeleteEvent,
    MessageEvent, PrivilegedChange, QuarantineManager, QuarantineOutcome, QuarantineStore,
    RaidHeuristic, ReconcileReport, RoleDeleteEvent, SecurityAdmin, SecurityResult,
    SelfActionMarker, SlidingWindow, TrustDecision, TrustResolver, Verdict, WebhookUpdateEvent,
    is_mass_mention, is_whitelisted,
};
use rxt_config::{ConfigStore, SecurityConfig};
use rxt_core::{
    AuditAction, Detector, GuildId, GuildView, LogCategory, MemberKey, MemberView, RoleId,
    UserId, ViolationType, WebhookId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Handled webhook IDs remembered before the set is reset.
const HANDLED_WEBHOOK_LIMIT: usize = 1024;

/// The abuse-detection engine.
///
/// # Examples
///
/// ```no_run
/// use rxt_config::MemoryConfigStore;
/// use rxt_security::{
///     EngineSettings, GuildPlatform, MemoryQuarantineStore, SecurityEngine, TracingLogSink,
/// };
/// use std::sync::Arc;
///
/// # async fn run(platform: Arc<dyn GuildPlatform>) -> Result<(), Box<dyn std::error::Error>> {
/// let engine = SecurityEngine::new(
///     platform,
///     Arc::new(MemoryConfigStore::new()),
///     Arc::new(MemoryQuarantineStore::new()),
///     Arc::new(TracingLogSink),
///     EngineSettings::default(),
/// );
/// let report = engine.reconcile().await?;
/// println!("restored {} expired quarantines", report.restored);
/// # Ok(())
/// # }
/// ```
pub struct SecurityEngine {
    platform: Arc<dyn GuildPlatform>,
    configs: Arc<dyn ConfigStore>,
    sink: Arc<dyn LogSink>,
    marker: SelfActionMarker,
    manager: QuarantineManager,
    trust: TrustResolver,
    settings: EngineSettings,
    messages: SlidingWindow<MemberKey>,
    joins: SlidingWindow<GuildId>,
    deletions: SlidingWindow<MemberKey>,
    links: LinkDetector,
    heuristic: RaidHeuristic,
    handled_webhooks: Mutex<HashSet<WebhookId>>,
}

impl std::fmt::Debug for SecurityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityEngine")
            .field("settings", &self.settings)
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl SecurityEngine {
    /// Wire an engine to its platform, stores and log sink.
    pub fn new(
        platform: Arc<dyn GuildPlatform>,
        configs: Arc<dyn ConfigStore>,
        store: Arc<dyn QuarantineStore>,
        sink: Arc<dyn LogSink>,
        settings: EngineSettings,
    ) -> Self {
        let marker = SelfActionMarker::new();
        let manager = QuarantineManager::new(
            platform.clone(),
            configs.clone(),
            store,
            sink.clone(),
            marker.clone(),
            settings.clone(),
        );
        let trust = TrustResolver::new(
            platform.clone(),
            marker.clone(),
            *settings.audit_lookback(),
            *settings.audit_timeout(),
            *settings.audit_fetch_limit(),
        );
        Self {
            platform,
            configs,
            sink,
            marker,
            manager,
            trust,
            settings,
            messages: SlidingWindow::new(),
            joins: SlidingWindow::new(),
            deletions: SlidingWindow::new(),
            links: LinkDetector::new(),
            heuristic: RaidHeuristic::new(),
            handled_webhooks: Mutex::new(HashSet::new()),
        }
    }

    /// The quarantine manager.
    pub fn manager(&self) -> &QuarantineManager {
        &self.manager
    }

    /// The self-action marker shared with the manager.
    pub fn marker(&self) -> &SelfActionMarker {
        &self.marker
    }

    /// Administrative surface over the same stores and ledger.
    pub fn admin(&self) -> SecurityAdmin {
        SecurityAdmin::new(self.configs.clone(), self.manager.clone(), self.sink.clone())
    }

    /// Restore quarantines that expired while the process was down and re-arm
    /// timers for the rest.
    ///
    /// # Errors
    ///
    /// Fails if the quarantine store cannot be read.
    pub async fn reconcile(&self) -> SecurityResult<ReconcileReport> {
        self.manager.reconcile().await
    }

    /// Evaluate a new message: link, mass mention, then message rate.
    #[instrument(
        skip(self, event),
        fields(guild_id = %event.guild.guild_id, user_id = %event.author.user_id)
    )]
    pub async fn on_message(&self, event: MessageEvent) -> SecurityResult<Verdict> {
        let guild = &event.guild;
        let author = &event.author;
        if author.user_id == guild.bot_user_id {
            return Ok(Verdict::Ignored("own message"));
        }
        let config = self.configs.get_config(guild.guild_id).await?;
        if !config.enabled {
            return Ok(Verdict::Ignored("security disabled"));
        }
        if is_whitelisted(guild, &config, author) {
            return Ok(Verdict::Whitelisted);
        }

        if config.detector_enabled(Detector::Link) {
            if let Some(host) =
                self.links
                    .find_blocked(&event.content, &config.blocked_domains, &config.allowed_domains)
            {
                let reason = format!("Posted a link to blocked domain {}", host);
                return self
                    .remove_and_quarantine(&event, reason, ViolationType::Link)
                    .await;
            }
        }

        if config.detector_enabled(Detector::Mention)
            && is_mass_mention(event.mentions_everyone, &event.content)
        {
            let reason = "Used a mass mention".to_string();
            return self
                .remove_and_quarantine(&event, reason, ViolationType::MassMention)
                .await;
        }

        if config.detector_enabled(Detector::Spam) {
            let key = MemberKey::new(guild.guild_id, author.user_id);
            if let Some(count) = self.messages.observe_crossing(
                key,
                now(),
                config.spam_window(),
                config.spam_msg_threshold as usize,
            ) {
                let reason = format!(
                    "Sent {} messages in {}s",
                    count, config.spam_time_window_secs
                );
                self.log(guild.guild_id, LogCategory::DetectorTriggered, &format!(
                    "Spam by <@{}>: {}",
                    author.user_id, reason
                ))
                .await;
                let outcome = self
                    .quarantine(guild, author, &reason, ViolationType::Spam)
                    .await?;
                return Ok(Verdict::Quarantined(outcome));
            }
        }

        Ok(Verdict::Clean)
    }

    /// Evaluate a join: join rate first, then the suspicious-account heuristic.
    /// Both eject (kick) rather than quarantine.
    #[instrument(
        skip(self, event),
        fields(guild_id = %event.guild.guild_id, user_id = %event.member.user_id)
    )]
    pub async fn on_member_join(&self, event: JoinEvent) -> SecurityResult<Verdict> {
        let guild = &event.guild;
        let member = &event.member;
        if member.user_id == guild.bot_user_id {
            return Ok(Verdict::Ignored("own join"));
        }
        let config = self.configs.get_config(guild.guild_id).await?;
        if !config.detector_enabled(Detector::Raid) {
            return Ok(Verdict::Ignored("raid detector disabled"));
        }
        if is_whitelisted(guild, &config, member) {
            return Ok(Verdict::Whitelisted);
        }

        if let Some(joins) = self.joins.observe_crossing(
            guild.guild_id,
            now(),
            config.raid_window(),
            config.raid_join_count as usize,
        ) {
            return self
                .eject(guild, member, EjectionReason::JoinRate { joins })
                .await;
        }

        if self.heuristic.is_suspicious(
            member,
            config.raid_min_account_age_days,
            chrono::Utc::now(),
        ) {
            return self
                .eject(guild, member, EjectionReason::SuspiciousAccount)
                .await;
        }

        Ok(Verdict::Clean)
    }

    /// Evaluate a member update for untrusted grants or removals of elevated roles.
    #[instrument(
        skip(self, event),
        fields(guild_id = %event.guild.guild_id, user_id = %event.after.user_id)
    )]
    pub async fn on_member_update(&self, event: MemberUpdateEvent) -> SecurityResult<Verdict> {
        let guild = &event.guild;
        let target = &event.after;
        let key = MemberKey::new(guild.guild_id, target.user_id);
        let config = self.configs.get_config(guild.guild_id).await?;
        if !config.detector_enabled(Detector::RoleEscalation) {
            return Ok(Verdict::Ignored("role escalation detector disabled"));
        }
        if self.marker.is_marked(key) {
            debug!("Member update echoes an engine action");
            return Ok(Verdict::Suppressed);
        }
        let Some(before) = &event.before_roles else {
            return self.on_unknown_role_update(guild, &config, target).await;
        };

        let added: Vec<RoleId> = target
            .role_ids
            .iter()
            .filter(|r| !before.contains(r))
            .copied()
            .collect();
        let removed: Vec<RoleId> = before
            .iter()
            .filter(|r| !target.role_ids.contains(r))
            .copied()
            .collect();
        if added.is_empty() && removed.is_empty() {
            return Ok(Verdict::Ignored("no role change"));
        }

        let elevated = self.elevated_roles(guild.guild_id, &config).await;
        let is_elevated = |role: &RoleId| elevated.get(role).copied().unwrap_or(true);
        let added: Vec<RoleId> = added.into_iter().filter(|r| is_elevated(r)).collect();
        let removed: Vec<RoleId> = removed.into_iter().filter(|r| is_elevated(r)).collect();
        if added.is_empty() && removed.is_empty() {
            return Ok(Verdict::Clean);
        }

        let change = PrivilegedChange::new(AuditAction::MemberRoleUpdate, Some(target.user_id.get()))
            .with_subject(key);
        let decision = match self.trust.resolve(guild, &config, change).await {
            ActorResolution::SystemOriginated => return Ok(Verdict::Suppressed),
            ActorResolution::Decided(decision) if decision.trusted() => {
                debug!(summary = %decision.summary(), "Privileged role change trusted");
                return Ok(Verdict::Trusted(decision));
            }
            ActorResolution::Decided(decision) => decision,
        };

        self.enforce_role_change(guild, target.user_id, &added, &removed, decision)
            .await
    }

    /// Role update for a member whose previous roles the adapter did not know.
    ///
    /// The change is read from the fresh audit entry instead. An untrusted
    /// entry without role details is taken to cover every elevated role the
    /// member now holds.
    async fn on_unknown_role_update(
        &self,
        guild: &GuildView,
        config: &SecurityConfig,
        target: &MemberView,
    ) -> SecurityResult<Verdict> {
        let key = MemberKey::new(guild.guild_id, target.user_id);
        let change = PrivilegedChange::new(AuditAction::MemberRoleUpdate, Some(target.user_id.get()))
            .with_subject(key);
        let decision = match self.trust.resolve(guild, config, change).await {
            ActorResolution::SystemOriginated => return Ok(Verdict::Suppressed),
            ActorResolution::Decided(decision) if decision.trusted() => {
                debug!(summary = %decision.summary(), "Privileged role change trusted");
                return Ok(Verdict::Trusted(decision));
            }
            ActorResolution::Decided(decision) => decision,
        };

        let elevated = self.elevated_roles(guild.guild_id, config).await;
        let is_elevated = |role: &RoleId| elevated.get(role).copied().unwrap_or(true);
        let held: Vec<RoleId> = target
            .role_ids
            .iter()
            .filter(|r| is_elevated(r))
            .copied()
            .collect();

        let recorded = match decision.evidence() {
            AuditEvidence::Entry(entry) => {
                Some((entry.roles_added().clone(), entry.roles_removed().clone()))
            }
            AuditEvidence::NoMatchingEntry => {
                return Ok(Verdict::Ignored("no role change recorded"));
            }
            AuditEvidence::LookupFailed(_) => None,
        };
        let (added, removed) = match recorded {
            Some((added, removed)) if added.is_empty() && removed.is_empty() => (held, added),
            Some((added, removed)) => (
                added.into_iter().filter(|r| is_elevated(r)).collect(),
                removed.into_iter().filter(|r| is_elevated(r)).collect(),
            ),
            None if held.is_empty() => {
                return Ok(Verdict::Ignored("previous roles unknown"));
            }
            None => {
                self.log(
                    guild.guild_id,
                    LogCategory::DetectorTriggered,
                    &format!(
                        "Possible elevated role change on <@{}> could not be checked: {}",
                        target.user_id,
                        decision.summary()
                    ),
                )
                .await;
                return Ok(Verdict::Unattributed(decision));
            }
        };
        if added.is_empty() && removed.is_empty() {
            return Ok(Verdict::Clean);
        }

        self.enforce_role_change(guild, target.user_id, &added, &removed, decision)
            .await
    }

    /// Undo an untrusted elevated role change and quarantine its actor.
    async fn enforce_role_change(
        &self,
        guild: &GuildView,
        user_id: UserId,
        added: &[RoleId],
        removed: &[RoleId],
        decision: TrustDecision,
    ) -> SecurityResult<Verdict> {
        self.revert_role_change(guild, user_id, added, removed)
            .await;
        self.log(
            guild.guild_id,
            LogCategory::ChangeReverted,
            &format!(
                "Reverted elevated role change on <@{}> (added {:?}, removed {:?}): {}",
                user_id,
                added.iter().map(|r| r.get()).collect::<Vec<_>>(),
                removed.iter().map(|r| r.get()).collect::<Vec<_>>(),
                decision.summary()
            ),
        )
        .await;

        let actor_id = *decision.actor_id();
        let quarantine = match actor_id {
            Some(actor) => {
                let reason = format!("Changed elevated roles of <@{}> without trust", user_id);
                self.quarantine_actor(guild, actor, &reason, ViolationType::RoleEscalation)
                    .await
            }
            None => None,
        };
        Ok(Verdict::Reverted {
            actor_id,
            quarantine,
        })
    }

    /// Count deletions against the deleter's mass-delete window.
    #[instrument(
        skip(self, event),
        fields(guild_id = %event.guild.guild_id, channel_id = %event.channel_id, count = event.message_ids.len())
    )]
    pub async fn on_message_delete(&self, event: MessageDeleteEvent) -> SecurityResult<Verdict> {
        let guild = &event.guild;
        let deleted = event.message_ids.len();
        if deleted == 0 {
            return Ok(Verdict::Ignored("nothing deleted"));
        }
        let config = self.configs.get_config(guild.guild_id).await?;
        if !config.detector_enabled(Detector::MassDelete) {
            return Ok(Verdict::Ignored("mass delete detector disabled"));
        }

        let change = if deleted > 1 {
            PrivilegedChange::new(AuditAction::MessageBulkDelete, Some(event.channel_id.get()))
        } else {
            PrivilegedChange::new(AuditAction::MessageDelete, event.author_id.map(UserId::get))
        };
        let decision = match self.trust.resolve(guild, &config, change).await {
            ActorResolution::SystemOriginated => return Ok(Verdict::Suppressed),
            ActorResolution::Decided(decision) if decision.trusted() => {
                return Ok(Verdict::Trusted(decision));
            }
            ActorResolution::Decided(decision) => decision,
        };

        let (deleter, attributed) = match (*decision.actor_id(), event.author_id) {
            (Some(actor), _) => (actor, true),
            (None, Some(author)) => (author, false),
            (None, None) => return Ok(Verdict::Ignored("deleter unknown")),
        };
        let key = MemberKey::new(guild.guild_id, deleter);
        if deleter == guild.bot_user_id || self.marker.is_marked(key) {
            return Ok(Verdict::Suppressed);
        }

        let mut member = None;
        if !attributed {
            match self.platform.member(guild.guild_id, deleter).await {
                Ok(m) if is_whitelisted(guild, &config, &m) => return Ok(Verdict::Whitelisted),
                Ok(m) => member = Some(m),
                Err(e) => debug!(error = %e, "Author lookup failed"),
            }
        }

        let Some(count) = self.deletions.observe_many_crossing(
            key,
            now(),
            config.mass_delete_window(),
            deleted,
            config.mass_delete_threshold as usize,
        ) else {
            return Ok(Verdict::Clean);
        };

        let reason = format!(
            "Deleted {} messages in {}s",
            count, config.mass_delete_time_window_secs
        );
        self.log(
            guild.guild_id,
            LogCategory::DetectorTriggered,
            &format!("Mass delete by <@{}>: {}", deleter, reason),
        )
        .await;
        let member = match member {
            Some(m) => m,
            None => self.platform.member(guild.guild_id, deleter).await?,
        };
        let outcome = self
            .quarantine(guild, &member, &reason, ViolationType::MassDelete)
            .await?;
        Ok(Verdict::Quarantined(outcome))
    }

    /// Quarantine the untrusted actor behind a channel deletion.
    #[instrument(skip(self, event), fields(guild_id = %event.guild.guild_id, channel_id = %event.channel_id))]
    pub async fn on_channel_delete(&self, event: ChannelDeleteEvent) -> SecurityResult<Verdict> {
        let guild = &event.guild;
        let config = self.configs.get_config(guild.guild_id).await?;
        let channel_id = event.channel_id;
        if config.quarantine_channel_id == Some(channel_id)
            || config.quarantine_category_id == Some(channel_id)
        {
            self.configs
                .update_config(
                    guild.guild_id,
                    Box::new(move |c| {
                        if c.quarantine_channel_id == Some(channel_id) {
                            c.quarantine_channel_id = None;
                        }
                        if c.quarantine_category_id == Some(channel_id) {
                            c.quarantine_category_id = None;
                        }
                    }),
                )
                .await?;
            info!("Quarantine channel deleted, it will be re-created on next use");
        }
        if !config.detector_enabled(Detector::Nuke) {
            return Ok(Verdict::Ignored("nuke detector disabled"));
        }

        let change = PrivilegedChange::new(AuditAction::ChannelDelete, Some(channel_id.get()));
        let description = format!("Deleted channel #{}", event.name);
        self.enforce_privileged(guild, &config, change, &description, ViolationType::ChannelDelete)
            .await
    }

    /// Quarantine the untrusted actor behind a role deletion.
    #[instrument(skip(self, event), fields(guild_id = %event.guild.guild_id, role_id = %event.role_id))]
    pub async fn on_role_delete(&self, event: RoleDeleteEvent) -> SecurityResult<Verdict> {
        let guild = &event.guild;
        let config = self.configs.get_config(guild.guild_id).await?;
        let role_id = event.role_id;
        if config.quarantine_role_id == Some(role_id) {
            self.configs
                .update_config(
                    guild.guild_id,
                    Box::new(move |c| {
                        if c.quarantine_role_id == Some(role_id) {
                            c.quarantine_role_id = None;
                        }
                    }),
                )
                .await?;
            info!("Quarantine role deleted, it will be re-created on next use");
        }
        if !config.detector_enabled(Detector::Nuke) {
            return Ok(Verdict::Ignored("nuke detector disabled"));
        }

        let change = PrivilegedChange::new(AuditAction::RoleDelete, Some(role_id.get()));
        let description = format!("Deleted role {}", role_id);
        self.enforce_privileged(guild, &config, change, &description, ViolationType::RoleDelete)
            .await
    }

    /// Delete a webhook created by an untrusted actor and quarantine the actor.
    #[instrument(skip(self, event), fields(guild_id = %event.guild.guild_id, channel_id = %event.channel_id))]
    pub async fn on_webhook_update(&self, event: WebhookUpdateEvent) -> SecurityResult<Verdict> {
        let guild = &event.guild;
        let config = self.configs.get_config(guild.guild_id).await?;
        if !config.detector_enabled(Detector::Webhook) {
            return Ok(Verdict::Ignored("webhook detector disabled"));
        }

        let change = PrivilegedChange::new(AuditAction::WebhookCreate, None);
        let decision = match self.trust.resolve(guild, &config, change).await {
            ActorResolution::SystemOriginated => return Ok(Verdict::Suppressed),
            ActorResolution::Decided(decision) if decision.trusted() => {
                return Ok(Verdict::Trusted(decision));
            }
            ActorResolution::Decided(decision) => decision,
        };
        let AuditEvidence::Entry(entry) = decision.evidence() else {
            debug!("Webhook update without a fresh creation entry");
            return Ok(Verdict::Ignored("no webhook creation"));
        };
        let Some(webhook_id) = entry.target_id().map(WebhookId::new) else {
            return Ok(Verdict::Ignored("webhook creation without target"));
        };
        if !self.first_sighting(webhook_id) {
            return Ok(Verdict::Suppressed);
        }

        if let Err(e) = self
            .platform
            .delete_webhook(webhook_id, "Webhook created by an untrusted member")
            .await
        {
            if !e.is_not_found() {
                warn!(error = %e, "Failed to delete webhook");
                self.log(
                    guild.guild_id,
                    LogCategory::ActionFailed,
                    &format!("Could not delete webhook {}: {}", webhook_id, e),
                )
                .await;
            }
        }

        let description = format!("Created webhook {} in <#{}>", webhook_id, event.channel_id);
        self.punish_actor(guild, decision, &description, ViolationType::WebhookCreate)
            .await
    }

    /// Attribute a privileged change and quarantine an untrusted actor.
    async fn enforce_privileged(
        &self,
        guild: &GuildView,
        config: &SecurityConfig,
        change: PrivilegedChange,
        description: &str,
        violation: ViolationType,
    ) -> SecurityResult<Verdict> {
        match self.trust.resolve(guild, config, change).await {
            ActorResolution::SystemOriginated => Ok(Verdict::Suppressed),
            ActorResolution::Decided(decision) if decision.trusted() => {
                debug!(summary = %decision.summary(), "Privileged change trusted");
                Ok(Verdict::Trusted(decision))
            }
            ActorResolution::Decided(decision) => {
                self.punish_actor(guild, decision, description, violation)
                    .await
            }
        }
    }

    async fn punish_actor(
        &self,
        guild: &GuildView,
        decision: TrustDecision,
        description: &str,
        violation: ViolationType,
    ) -> SecurityResult<Verdict> {
        let Some(actor) = *decision.actor_id() else {
            self.log(
                guild.guild_id,
                LogCategory::DetectorTriggered,
                &format!("{} by an unknown actor: {}", description, decision.summary()),
            )
            .await;
            return Ok(Verdict::Unattributed(decision));
        };
        self.log(
            guild.guild_id,
            LogCategory::DetectorTriggered,
            &format!("{} by untrusted <@{}>", description, actor),
        )
        .await;
        let member = self.platform.member(guild.guild_id, actor).await?;
        let outcome = self.quarantine(guild, &member, description, violation).await?;
        Ok(Verdict::Quarantined(outcome))
    }

    async fn remove_and_quarantine(
        &self,
        event: &MessageEvent,
        reason: String,
        violation: ViolationType,
    ) -> SecurityResult<Verdict> {
        let guild = &event.guild;
        let author = &event.author;
        self.log(
            guild.guild_id,
            LogCategory::DetectorTriggered,
            &format!("{} by <@{}> in <#{}>", reason, author.user_id, event.channel_id),
        )
        .await;

        let key = MemberKey::new(guild.guild_id, author.user_id);
        self.marker.mark(key);
        if let Err(e) = self
            .platform
            .delete_message(event.channel_id, event.message_id)
            .await
        {
            if !e.is_not_found() {
                warn!(error = %e, "Failed to delete offending message");
                self.log(
                    guild.guild_id,
                    LogCategory::ActionFailed,
                    &format!("Could not delete message {}: {}", event.message_id, e),
                )
                .await;
            }
        }
        self.marker
            .release_after(key, *self.settings.self_action_grace());

        let quarantine = self.quarantine(guild, author, &reason, violation).await?;
        Ok(Verdict::MessageRemoved {
            message_id: event.message_id,
            violation,
            quarantine,
        })
    }

    /// Quarantine through the manager, logging a failure to the sink.
    async fn quarantine(
        &self,
        guild: &GuildView,
        member: &MemberView,
        reason: &str,
        violation: ViolationType,
    ) -> SecurityResult<QuarantineOutcome> {
        match self
            .manager
            .apply_quarantine(guild, member, reason, violation)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.log(
                    guild.guild_id,
                    LogCategory::ActionFailed,
                    &format!("Could not quarantine <@{}>: {}", member.user_id, e.kind()),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Quarantine an actor identified by ID; failures are logged, not returned.
    async fn quarantine_actor(
        &self,
        guild: &GuildView,
        actor: UserId,
        reason: &str,
        violation: ViolationType,
    ) -> Option<QuarantineOutcome> {
        let member = match self.platform.member(guild.guild_id, actor).await {
            Ok(member) => member,
            Err(e) => {
                warn!(actor = %actor, error = %e, "Cannot look up actor to quarantine");
                return None;
            }
        };
        self.quarantine(guild, &member, reason, violation).await.ok()
    }

    async fn eject(
        &self,
        guild: &GuildView,
        member: &MemberView,
        reason: EjectionReason,
    ) -> SecurityResult<Verdict> {
        let audit_reason = format!("Raid protection: {}", reason);
        if let Err(e) = self
            .platform
            .kick_member(guild.guild_id, member.user_id, &audit_reason)
            .await
        {
            self.log(
                guild.guild_id,
                LogCategory::ActionFailed,
                &format!("Could not eject <@{}>: {}", member.user_id, e),
            )
            .await;
            return Err(e.into());
        }
        self.log(
            guild.guild_id,
            LogCategory::RaidEjection,
            &format!("Ejected <@{}> ({})", member.user_id, reason),
        )
        .await;
        Ok(Verdict::Ejected {
            user_id: member.user_id,
            reason,
        })
    }

    /// Undo an untrusted role change on `user_id`.
    async fn revert_role_change(
        &self,
        guild: &GuildView,
        user_id: UserId,
        added: &[RoleId],
        removed: &[RoleId],
    ) {
        let key = MemberKey::new(guild.guild_id, user_id);
        let reason = "Reverting untrusted elevated role change";
        self.marker.mark(key);
        for role_id in added {
            if let Err(e) = self
                .platform
                .remove_role(guild.guild_id, user_id, *role_id, reason)
                .await
            {
                warn!(role_id = %role_id, error = %e, "Failed to revoke granted role");
            }
        }
        for role_id in removed {
            if let Err(e) = self
                .platform
                .add_role(guild.guild_id, user_id, *role_id, reason)
                .await
            {
                if !e.is_not_found() {
                    warn!(role_id = %role_id, error = %e, "Failed to re-add removed role");
                }
            }
        }
        self.marker
            .release_after(key, *self.settings.self_action_grace());
    }

    /// Whether each known role carries elevated permissions. The quarantine
    /// role never counts. Unknown roles are absent from the map.
    async fn elevated_roles(
        &self,
        guild_id: GuildId,
        config: &SecurityConfig,
    ) -> HashMap<RoleId, bool> {
        match self.platform.roles(guild_id).await {
            Ok(roles) => roles
                .into_iter()
                .map(|r| {
                    let elevated = Some(r.id) != config.quarantine_role_id
                        && r.permissions.is_elevated();
                    (r.id, elevated)
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "Role list unavailable, treating changed roles as elevated");
                config
                    .quarantine_role_id
                    .map(|id| (id, false))
                    .into_iter()
                    .collect()
            }
        }
    }

    /// Record a handled webhook; false if it was handled before.
    fn first_sighting(&self, webhook_id: WebhookId) -> bool {
        let mut handled = self
            .handled_webhooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if handled.len() >= HANDLED_WEBHOOK_LIMIT {
            handled.clear();
        }
        handled.insert(webhook_id)
    }

    async fn log(&self, guild_id: GuildId, category: LogCategory, message: &str) {
        self.sink.log_action(guild_id, category, message).await;
    }
}

/// Monotonic now; follows the paused clock in tests.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
