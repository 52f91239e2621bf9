//! [`GuildPlatform`] over Serenity's HTTP client.

use crate::conversions::{
    audit_action, clamp_timeout, from_channel, from_role, from_user, member_view, permission_overwrite,
    platform_error, role_changes, role_view, serenity_permissions, timestamp, to_channel, to_guild, to_message,
    to_role, to_user, to_webhook,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rxt_core::{
    AuditAction, AuditEntry, ChannelId, GuildId, GuildView, MemberView, MessageId, Permissions,
    RoleId, RoleView, UserId, WebhookId,
};
use rxt_error::PlatformResult;
use rxt_security::{ChannelOverwrite, GuildPlatform};
use serenity::builder::{CreateChannel, CreateMessage, EditMember, EditRole};
use serenity::http::Http;
use serenity::model::channel::ChannelType;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Discord implementation of the engine's platform interface.
///
/// Every call goes straight to the REST API; Serenity handles rate limits.
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
    bot_user_id: UserId,
}

impl std::fmt::Debug for SerenityPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerenityPlatform")
            .field("bot_user_id", &self.bot_user_id)
            .finish_non_exhaustive()
    }
}

impl SerenityPlatform {
    /// Create a platform acting as `bot_user_id`.
    pub fn new(http: Arc<Http>, bot_user_id: UserId) -> Self {
        Self { http, bot_user_id }
    }

    /// The bot's own user ID.
    pub fn bot_user_id(&self) -> UserId {
        self.bot_user_id
    }

    /// The shared HTTP client.
    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }
}

#[async_trait]
impl GuildPlatform for SerenityPlatform {
    #[instrument(skip(self))]
    async fn guild(&self, guild_id: GuildId) -> PlatformResult<GuildView> {
        let guild = self
            .http
            .get_guild(to_guild(guild_id))
            .await
            .map_err(platform_error)?;
        Ok(GuildView::new(
            guild_id,
            from_user(guild.owner_id),
            self.bot_user_id,
        ))
    }

    #[instrument(skip(self))]
    async fn member(&self, guild_id: GuildId, user_id: UserId) -> PlatformResult<MemberView> {
        let member = self
            .http
            .get_member(to_guild(guild_id), to_user(user_id))
            .await
            .map_err(platform_error)?;
        Ok(member_view(&member))
    }

    #[instrument(skip(self))]
    async fn roles(&self, guild_id: GuildId) -> PlatformResult<Vec<RoleView>> {
        let roles = self
            .http
            .get_guild_roles(to_guild(guild_id))
            .await
            .map_err(platform_error)?;
        Ok(roles.iter().map(role_view).collect())
    }

    #[instrument(skip(self))]
    async fn channel_ids(&self, guild_id: GuildId) -> PlatformResult<Vec<ChannelId>> {
        let channels = self
            .http
            .get_channels(to_guild(guild_id))
            .await
            .map_err(platform_error)?;
        Ok(channels.iter().map(|c| from_channel(c.id)).collect())
    }

    #[instrument(skip(self))]
    async fn create_role(
        &self,
        guild_id: GuildId,
        name: &str,
        permissions: Permissions,
    ) -> PlatformResult<RoleId> {
        let builder = EditRole::new()
            .name(name)
            .permissions(serenity_permissions(permissions))
            .audit_log_reason("Quarantine role");
        let http: &Http = &self.http;
        let role = to_guild(guild_id)
            .create_role(http, builder)
            .await
            .map_err(platform_error)?;
        debug!(role_id = %role.id, "Role created");
        Ok(from_role(role.id))
    }

    #[instrument(skip(self, overwrites))]
    async fn create_category(
        &self,
        guild_id: GuildId,
        name: &str,
        overwrites: Vec<ChannelOverwrite>,
    ) -> PlatformResult<ChannelId> {
        let builder = CreateChannel::new(name)
            .kind(ChannelType::Category)
            .permissions(
                overwrites
                    .into_iter()
                    .map(|o| permission_overwrite(guild_id, o)),
            )
            .audit_log_reason("Quarantine category");
        let http: &Http = &self.http;
        let channel = to_guild(guild_id)
            .create_channel(http, builder)
            .await
            .map_err(platform_error)?;
        Ok(from_channel(channel.id))
    }

    #[instrument(skip(self, overwrites))]
    async fn create_text_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        parent: Option<ChannelId>,
        overwrites: Vec<ChannelOverwrite>,
    ) -> PlatformResult<ChannelId> {
        let mut builder = CreateChannel::new(name)
            .kind(ChannelType::Text)
            .permissions(
                overwrites
                    .into_iter()
                    .map(|o| permission_overwrite(guild_id, o)),
            )
            .audit_log_reason("Quarantine channel");
        if let Some(parent) = parent {
            builder = builder.category(to_channel(parent));
        }
        let http: &Http = &self.http;
        let channel = to_guild(guild_id)
            .create_channel(http, builder)
            .await
            .map_err(platform_error)?;
        Ok(from_channel(channel.id))
    }

    #[instrument(skip(self, overwrite))]
    async fn set_channel_overwrite(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        overwrite: ChannelOverwrite,
    ) -> PlatformResult<()> {
        let http: &Http = &self.http;
        to_channel(channel_id)
            .create_permission(http, permission_overwrite(guild_id, overwrite))
            .await
            .map_err(platform_error)
    }

    #[instrument(skip(self, reason))]
    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> PlatformResult<()> {
        self.http
            .add_member_role(to_guild(guild_id), to_user(user_id), to_role(role_id), Some(reason))
            .await
            .map_err(platform_error)
    }

    #[instrument(skip(self, reason))]
    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> PlatformResult<()> {
        self.http
            .remove_member_role(to_guild(guild_id), to_user(user_id), to_role(role_id), Some(reason))
            .await
            .map_err(platform_error)
    }

    #[instrument(skip(self))]
    async fn timeout_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        until: DateTime<Utc>,
    ) -> PlatformResult<()> {
        let until = clamp_timeout(until, Utc::now());
        let builder = EditMember::new()
            .disable_communication_until(until.to_rfc3339())
            .audit_log_reason("Quarantine");
        let http: &Http = &self.http;
        to_guild(guild_id)
            .edit_member(http, to_user(user_id), builder)
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_timeout(&self, guild_id: GuildId, user_id: UserId) -> PlatformResult<()> {
        let builder = EditMember::new()
            .enable_communication()
            .audit_log_reason("Quarantine lifted");
        let http: &Http = &self.http;
        to_guild(guild_id)
            .edit_member(http, to_user(user_id), builder)
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    #[instrument(skip(self, reason))]
    async fn kick_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: &str,
    ) -> PlatformResult<()> {
        self.http
            .kick_member(to_guild(guild_id), to_user(user_id), Some(reason))
            .await
            .map_err(platform_error)
    }

    #[instrument(skip(self))]
    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> PlatformResult<()> {
        self.http
            .delete_message(to_channel(channel_id), to_message(message_id), None)
            .await
            .map_err(platform_error)
    }

    #[instrument(skip(self, reason))]
    async fn delete_webhook(&self, webhook_id: WebhookId, reason: &str) -> PlatformResult<()> {
        self.http
            .delete_webhook(to_webhook(webhook_id), Some(reason))
            .await
            .map_err(platform_error)
    }

    #[instrument(skip(self, content))]
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> PlatformResult<()> {
        let http: &Http = &self.http;
        to_channel(channel_id)
            .say(http, content)
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    #[instrument(skip(self, content))]
    async fn send_direct_message(&self, user_id: UserId, content: &str) -> PlatformResult<()> {
        let http: &Http = &self.http;
        to_user(user_id)
            .direct_message(http, CreateMessage::new().content(content))
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn audit_entries(
        &self,
        guild_id: GuildId,
        action: AuditAction,
        limit: u8,
    ) -> PlatformResult<Vec<AuditEntry>> {
        let logs = self
            .http
            .get_audit_logs(
                to_guild(guild_id),
                Some(audit_action(action)),
                None,
                None,
                Some(limit),
            )
            .await
            .map_err(platform_error)?;
        Ok(logs
            .entries
            .iter()
            .map(|entry| {
                let (added, removed) = role_changes(entry.changes.as_deref().unwrap_or_default());
                let converted = AuditEntry::new(
                    action,
                    from_user(entry.user_id),
                    entry.target_id.map(|t| t.get()),
                    timestamp(entry.id.created_at()),
                )
                .with_role_changes(added, removed);
                match &entry.reason {
                    Some(reason) => converted.with_reason(reason.clone()),
                    None => converted,
                }
            })
            .collect())
    }
}
