//! Administrative operations.
//!
//! Every configuration change goes through [`ConfigStore::update_config`] so
//! concurrent edits never lose each other, and emits one `config_changed` line
//! to the log sink.

use crate::{
    LogSink, QuarantineEntry, QuarantineManager, QuarantineOutcome, RestoreReport,
    SecurityError, SecurityResult, is_whitelisted,
};
use rxt_config::{ConfigStore, SecurityConfig, Threshold};
use rxt_core::{
    ChannelId, Detector, GuildId, GuildView, LogCategory, MemberKey, MemberView, RoleId, UserId,
    ViolationType,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument};

/// Administrative surface over guild configuration and the quarantine ledger.
#[derive(Clone)]
pub struct SecurityAdmin {
    configs: Arc<dyn ConfigStore>,
    manager: QuarantineManager,
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for SecurityAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityAdmin")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl SecurityAdmin {
    /// Create the admin surface.
    pub fn new(
        configs: Arc<dyn ConfigStore>,
        manager: QuarantineManager,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            configs,
            manager,
            sink,
        }
    }

    /// Current configuration of a guild.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read.
    pub async fn config(&self, guild_id: GuildId) -> SecurityResult<SecurityConfig> {
        Ok(self.configs.get_config(guild_id).await?)
    }

    /// Quarantine a member on a moderator's request.
    ///
    /// # Errors
    ///
    /// See [`QuarantineManager::apply_quarantine`].
    #[instrument(skip(self, guild, member, reason), fields(guild_id = %guild.guild_id, user_id = %member.user_id))]
    pub async fn apply_quarantine(
        &self,
        guild: &GuildView,
        member: &MemberView,
        moderator: UserId,
        reason: &str,
    ) -> SecurityResult<QuarantineOutcome> {
        let reason = format!("{} (by <@{}>)", reason, moderator);
        self.manager
            .apply_quarantine(guild, member, &reason, ViolationType::Manual)
            .await
    }

    /// Release a quarantined member on a moderator's request.
    ///
    /// # Errors
    ///
    /// Returns `NotQuarantined` if the member has no active quarantine.
    #[instrument(skip(self))]
    pub async fn remove_quarantine_manual(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        moderator: UserId,
    ) -> SecurityResult<RestoreReport> {
        self.manager
            .remove_quarantine_manual(MemberKey::new(guild_id, user_id), Some(moderator))
            .await
    }

    /// The active quarantine of a member, if any.
    pub async fn status(&self, guild_id: GuildId, user_id: UserId) -> Option<QuarantineEntry> {
        self.manager.status(MemberKey::new(guild_id, user_id)).await
    }

    /// Whether `member` bypasses every detector.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read.
    pub async fn is_whitelisted(&self, guild: &GuildView, member: &MemberView) -> SecurityResult<bool> {
        let config = self.configs.get_config(guild.guild_id).await?;
        Ok(is_whitelisted(guild, &config, member))
    }

    /// Add a user to the whitelist. Returns false if already present.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub async fn whitelist_user(&self, guild_id: GuildId, user_id: UserId) -> SecurityResult<bool> {
        self.toggle(guild_id, format!("Whitelisted user <@{}>", user_id), move |c| {
            c.whitelist_user(user_id)
        })
        .await
    }

    /// Remove a user from the whitelist. Returns false if absent.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub async fn unwhitelist_user(&self, guild_id: GuildId, user_id: UserId) -> SecurityResult<bool> {
        self.toggle(guild_id, format!("Removed user <@{}> from whitelist", user_id), move |c| {
            c.unwhitelist_user(user_id)
        })
        .await
    }

    /// Add a role to the whitelist. Returns false if already present.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub async fn whitelist_role(&self, guild_id: GuildId, role_id: RoleId) -> SecurityResult<bool> {
        self.toggle(guild_id, format!("Whitelisted role <@&{}>", role_id), move |c| {
            c.whitelist_role(role_id)
        })
        .await
    }

    /// Remove a role from the whitelist. Returns false if absent.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub async fn unwhitelist_role(&self, guild_id: GuildId, role_id: RoleId) -> SecurityResult<bool> {
        self.toggle(guild_id, format!("Removed role <@&{}> from whitelist", role_id), move |c| {
            c.unwhitelist_role(role_id)
        })
        .await
    }

    /// Add a bot to the whitelist. Returns false if already present.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub async fn whitelist_bot(&self, guild_id: GuildId, bot_id: UserId) -> SecurityResult<bool> {
        self.toggle(guild_id, format!("Whitelisted bot <@{}>", bot_id), move |c| {
            c.whitelist_bot(bot_id)
        })
        .await
    }

    /// Remove a bot from the whitelist. Returns false if absent.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub async fn unwhitelist_bot(&self, guild_id: GuildId, bot_id: UserId) -> SecurityResult<bool> {
        self.toggle(guild_id, format!("Removed bot <@{}> from whitelist", bot_id), move |c| {
            c.unwhitelist_bot(bot_id)
        })
        .await
    }

    /// Enable or disable one detector.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub async fn set_detector_enabled(
        &self,
        guild_id: GuildId,
        detector: Detector,
        enabled: bool,
    ) -> SecurityResult<SecurityConfig> {
        let state = if enabled { "enabled" } else { "disabled" };
        self.mutate(guild_id, format!("Detector {} {}", detector, state), move |c| {
            c.set_detector(detector, enabled)
        })
        .await
    }

    /// Flip the master switch.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub async fn set_enabled(&self, guild_id: GuildId, enabled: bool) -> SecurityResult<SecurityConfig> {
        let state = if enabled { "enabled" } else { "disabled" };
        self.mutate(guild_id, format!("Security {}", state), move |c| {
            c.enabled = enabled
        })
        .await
    }

    /// Set a numeric threshold.
    ///
    /// # Errors
    ///
    /// Rejects zero counts and windows, and values that do not fit the field.
    pub async fn set_threshold(
        &self,
        guild_id: GuildId,
        threshold: Threshold,
        value: u64,
    ) -> SecurityResult<SecurityConfig> {
        let mut probe = self.configs.get_config(guild_id).await?;
        probe.set_threshold(threshold, value)?;

        self.mutate(
            guild_id,
            format!("Threshold {:?} set to {}", threshold, value),
            move |c| {
                // Validated on the probe above.
                let _ = c.set_threshold(threshold, value);
            },
        )
        .await
    }

    /// Set or clear the main moderator role.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub async fn set_main_moderator_role(
        &self,
        guild_id: GuildId,
        role_id: Option<RoleId>,
    ) -> SecurityResult<SecurityConfig> {
        let description = match role_id {
            Some(id) => format!("Main moderator role set to <@&{}>", id),
            None => "Main moderator role cleared".to_string(),
        };
        self.mutate(guild_id, description, move |c| c.main_moderator_role_id = role_id)
            .await
    }

    /// Set or clear the log channel.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be written.
    pub async fn set_log_channel(
        &self,
        guild_id: GuildId,
        channel_id: Option<ChannelId>,
    ) -> SecurityResult<SecurityConfig> {
        let description = match channel_id {
            Some(id) => format!("Log channel set to <#{}>", id),
            None => "Log channel cleared".to_string(),
        };
        self.mutate(guild_id, description, move |c| c.log_channel_id = channel_id)
            .await
    }

    async fn mutate<F>(
        &self,
        guild_id: GuildId,
        description: String,
        mutation: F,
    ) -> SecurityResult<SecurityConfig>
    where
        F: FnOnce(&mut SecurityConfig) + Send + 'static,
    {
        let updated = self
            .configs
            .update_config(guild_id, Box::new(mutation))
            .await?;
        info!(guild_id = %guild_id, change = %description, "Configuration changed");
        self.sink
            .log_action(guild_id, LogCategory::ConfigChanged, &description)
            .await;
        Ok(updated)
    }

    /// Apply a set edit that reports whether it changed anything.
    async fn toggle<F>(&self, guild_id: GuildId, description: String, edit: F) -> SecurityResult<bool>
    where
        F: FnOnce(&mut SecurityConfig) -> bool + Send + 'static,
    {
        let changed = Arc::new(AtomicBool::new(false));
        let flag = changed.clone();
        let updated = self
            .configs
            .update_config(
                guild_id,
                Box::new(move |c| flag.store(edit(c), Ordering::SeqCst)),
            )
            .await;
        updated.map_err(SecurityError::from)?;

        let changed = changed.load(Ordering::SeqCst);
        if changed {
            info!(guild_id = %guild_id, change = %description, "Configuration changed");
            self.sink
                .log_action(guild_id, LogCategory::ConfigChanged, &description)
                .await;
        }
        Ok(changed)
    }
}
