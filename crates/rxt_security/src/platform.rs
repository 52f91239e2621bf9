//! Platform and log-sink seams.
//!
//! The engine never talks to a chat SDK directly. Adapters implement
//! [`GuildPlatform`] for the calls the engine makes and [`LogSink`] for where
//! categorized security log lines go.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rxt_core::{
    AuditAction, AuditEntry, ChannelId, GuildId, GuildView, LogCategory, MemberView, MessageId,
    Permissions, RoleId, RoleView, UserId, WebhookId,
};
use rxt_error::PlatformResult;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Who a channel permission overwrite applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverwriteTarget {
    /// The guild's implicit default role.
    Everyone,
    /// A specific role.
    Role(RoleId),
    /// A specific member.
    Member(UserId),
}

/// A channel permission overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOverwrite {
    /// Who the overwrite applies to
    pub target: OverwriteTarget,
    /// Permissions explicitly granted
    pub allow: Permissions,
    /// Permissions explicitly denied
    pub deny: Permissions,
}

impl ChannelOverwrite {
    /// Create an overwrite.
    pub fn new(target: OverwriteTarget, allow: Permissions, deny: Permissions) -> Self {
        Self {
            target,
            allow,
            deny,
        }
    }
}

/// Chat platform operations the engine depends on.
///
/// Implementations classify failures into [`rxt_error::PlatformErrorKind`];
/// the engine skips `NotFound` targets silently and logs everything else.
#[async_trait]
pub trait GuildPlatform: Send + Sync {
    /// Owner and bot identity for a guild.
    async fn guild(&self, guild_id: GuildId) -> PlatformResult<GuildView>;

    /// A member's current state.
    async fn member(&self, guild_id: GuildId, user_id: UserId) -> PlatformResult<MemberView>;

    /// Every role that currently exists in the guild.
    async fn roles(&self, guild_id: GuildId) -> PlatformResult<Vec<RoleView>>;

    /// Every channel and category that currently exists in the guild.
    async fn channel_ids(&self, guild_id: GuildId) -> PlatformResult<Vec<ChannelId>>;

    /// Create a role with guild-level `permissions`.
    async fn create_role(
        &self,
        guild_id: GuildId,
        name: &str,
        permissions: Permissions,
    ) -> PlatformResult<RoleId>;

    /// Create a category channel.
    async fn create_category(
        &self,
        guild_id: GuildId,
        name: &str,
        overwrites: Vec<ChannelOverwrite>,
    ) -> PlatformResult<ChannelId>;

    /// Create a text channel, optionally inside a category.
    async fn create_text_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        parent: Option<ChannelId>,
        overwrites: Vec<ChannelOverwrite>,
    ) -> PlatformResult<ChannelId>;

    /// Set one permission overwrite on an existing channel.
    async fn set_channel_overwrite(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        overwrite: ChannelOverwrite,
    ) -> PlatformResult<()>;

    /// Give a member a role.
    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> PlatformResult<()>;

    /// Take a role from a member.
    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> PlatformResult<()>;

    /// Apply the platform's native timeout until `until`.
    async fn timeout_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        until: DateTime<Utc>,
    ) -> PlatformResult<()>;

    /// Lift a native timeout.
    async fn clear_timeout(&self, guild_id: GuildId, user_id: UserId) -> PlatformResult<()>;

    /// Remove a member from the guild.
    async fn kick_member(&self, guild_id: GuildId, user_id: UserId, reason: &str)
    -> PlatformResult<()>;

    /// Delete a message.
    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> PlatformResult<()>;

    /// Delete a webhook.
    async fn delete_webhook(&self, webhook_id: WebhookId, reason: &str) -> PlatformResult<()>;

    /// Post a message in a channel.
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> PlatformResult<()>;

    /// Send a direct message.
    async fn send_direct_message(&self, user_id: UserId, content: &str) -> PlatformResult<()>;

    /// The most recent audit entries of `action`, newest first.
    async fn audit_entries(
        &self,
        guild_id: GuildId,
        action: AuditAction,
        limit: u8,
    ) -> PlatformResult<Vec<AuditEntry>>;
}

/// Destination for categorized security log lines.
///
/// Sinks are best-effort: they swallow and trace their own failures.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Record one line for `guild_id`.
    async fn log_action(&self, guild_id: GuildId, category: LogCategory, message: &str);
}

/// Log sink that writes to `tracing` under the `rxt::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

#[async_trait]
impl LogSink for TracingLogSink {
    async fn log_action(&self, guild_id: GuildId, category: LogCategory, message: &str) {
        info!(
            target: "rxt::audit",
            guild_id = %guild_id,
            category = %category,
            "{}",
            message
        );
    }
}
