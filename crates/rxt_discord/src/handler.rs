//! Gateway event handler feeding the security engine.
//!
//! Each Serenity event is converted into the matching engine event, handed to
//! the [`SecurityEngine`], and the returned verdict is traced. The handler
//! never enforces anything itself.

use crate::conversions::{
    from_channel, from_guild, from_message, from_role, from_user, member_view, user_view,
};
use rxt_core::{GuildView, UserId};
use rxt_security::{
    ChannelDeleteEvent, GuildPlatform, JoinEvent, MemberUpdateEvent, MessageDeleteEvent,
    MessageEvent, RoleDeleteEvent, SecurityEngine, SecurityResult, Verdict, WebhookUpdateEvent,
};
use serenity::async_trait;
use serenity::model::channel::{GuildChannel, Message};
use serenity::model::event::GuildMemberUpdateEvent;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::guild::{Member, Role};
use serenity::model::id as sid;
use serenity::prelude::{Context, EventHandler};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::SerenityPlatform;

/// Message authors remembered for deletion attribution.
const MAX_TRACKED_AUTHORS: usize = 10_000;

/// Serenity event handler for the security engine.
pub struct RxtHandler {
    engine: Arc<SecurityEngine>,
    platform: Arc<SerenityPlatform>,
    /// Recent message authors; the gateway's delete events only carry IDs
    authors: Mutex<HashMap<sid::MessageId, sid::UserId>>,
}

impl RxtHandler {
    /// Create a handler dispatching into `engine`.
    pub fn new(engine: Arc<SecurityEngine>, platform: Arc<SerenityPlatform>) -> Self {
        Self {
            engine,
            platform,
            authors: Mutex::new(HashMap::new()),
        }
    }

    /// Gateway intents the handler needs.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_MODERATION
            | GatewayIntents::GUILD_WEBHOOKS
    }

    /// Owner and bot identity, from the cache when the guild is cached.
    async fn guild_view(&self, ctx: &Context, guild_id: sid::GuildId) -> Option<GuildView> {
        let bot = self.platform.bot_user_id();
        let cached = ctx.cache.guild(guild_id).map(|g| g.owner_id);
        if let Some(owner) = cached {
            return Some(GuildView::new(from_guild(guild_id), from_user(owner), bot));
        }
        match self.platform.guild(from_guild(guild_id)).await {
            Ok(view) => Some(view),
            Err(e) => {
                warn!(guild_id = %guild_id, error = %e, "Guild lookup failed; event dropped");
                None
            }
        }
    }

    async fn remember_author(&self, message_id: sid::MessageId, author: sid::UserId) {
        let mut authors = self.authors.lock().await;
        if authors.len() >= MAX_TRACKED_AUTHORS {
            authors.clear();
        }
        authors.insert(message_id, author);
    }

    async fn take_author(&self, message_id: sid::MessageId) -> Option<UserId> {
        self.authors.lock().await.remove(&message_id).map(from_user)
    }
}

/// Trace an engine verdict.
fn report(event: &'static str, result: SecurityResult<Verdict>) {
    match result {
        Ok(verdict) if verdict.is_enforcement() => info!(event, ?verdict, "Engine enforced"),
        Ok(verdict) => debug!(event, ?verdict, "Engine verdict"),
        Err(e) => warn!(event, error = %e, "Engine failed to handle event"),
    }
}

#[async_trait]
impl EventHandler for RxtHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot = %ready.user.name,
            guilds = ready.guilds.len(),
            "Connected to Discord gateway"
        );
    }

    #[instrument(skip(self, ctx, msg), fields(message_id = %msg.id))]
    async fn message(&self, ctx: Context, msg: Message) {
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        if msg.webhook_id.is_some() {
            return;
        }
        self.remember_author(msg.id, msg.author.id).await;
        let Some(guild) = self.guild_view(&ctx, guild_id).await else {
            return;
        };

        let author = match &msg.member {
            Some(member) => user_view(&msg.author, &member.roles, member.nick.as_deref()),
            None => user_view(&msg.author, &[], None),
        };
        let event = MessageEvent {
            guild,
            channel_id: from_channel(msg.channel_id),
            message_id: from_message(msg.id),
            author,
            content: msg.content.clone(),
            mentions_everyone: msg.mention_everyone,
        };
        report("message", self.engine.on_message(event).await);
    }

    #[instrument(skip(self, ctx, new_member), fields(user_id = %new_member.user.id))]
    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        let Some(guild) = self.guild_view(&ctx, new_member.guild_id).await else {
            return;
        };
        let event = JoinEvent {
            guild,
            member: member_view(&new_member),
        };
        report("member_join", self.engine.on_member_join(event).await);
    }

    #[instrument(skip_all, fields(user_id = %event.user.id))]
    async fn guild_member_update(
        &self,
        ctx: Context,
        old_if_available: Option<Member>,
        _new: Option<Member>,
        event: GuildMemberUpdateEvent,
    ) {
        let Some(guild) = self.guild_view(&ctx, event.guild_id).await else {
            return;
        };
        let event = MemberUpdateEvent {
            guild,
            before_roles: old_if_available
                .map(|old| old.roles.iter().copied().map(from_role).collect()),
            after: user_view(&event.user, &event.roles, event.nick.as_deref()),
        };
        report("member_update", self.engine.on_member_update(event).await);
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: sid::ChannelId,
        deleted_message_id: sid::MessageId,
        guild_id: Option<sid::GuildId>,
    ) {
        let author_id = self.take_author(deleted_message_id).await;
        let Some(guild_id) = guild_id else {
            return;
        };
        let Some(guild) = self.guild_view(&ctx, guild_id).await else {
            return;
        };
        let event = MessageDeleteEvent {
            guild,
            channel_id: from_channel(channel_id),
            message_ids: vec![from_message(deleted_message_id)],
            author_id,
        };
        report("message_delete", self.engine.on_message_delete(event).await);
    }

    async fn message_delete_bulk(
        &self,
        ctx: Context,
        channel_id: sid::ChannelId,
        multiple_deleted_messages_ids: Vec<sid::MessageId>,
        guild_id: Option<sid::GuildId>,
    ) {
        {
            let mut authors = self.authors.lock().await;
            for id in &multiple_deleted_messages_ids {
                authors.remove(id);
            }
        }
        let Some(guild_id) = guild_id else {
            return;
        };
        let Some(guild) = self.guild_view(&ctx, guild_id).await else {
            return;
        };
        let event = MessageDeleteEvent {
            guild,
            channel_id: from_channel(channel_id),
            message_ids: multiple_deleted_messages_ids
                .into_iter()
                .map(from_message)
                .collect(),
            author_id: None,
        };
        report("message_delete_bulk", self.engine.on_message_delete(event).await);
    }

    #[instrument(skip(self, ctx, channel, _messages), fields(channel_id = %channel.id))]
    async fn channel_delete(
        &self,
        ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        let Some(guild) = self.guild_view(&ctx, channel.guild_id).await else {
            return;
        };
        let event = ChannelDeleteEvent {
            guild,
            channel_id: from_channel(channel.id),
            name: channel.name.clone(),
        };
        report("channel_delete", self.engine.on_channel_delete(event).await);
    }

    #[instrument(skip(self, ctx, _removed_role_data_if_available))]
    async fn guild_role_delete(
        &self,
        ctx: Context,
        guild_id: sid::GuildId,
        removed_role_id: sid::RoleId,
        _removed_role_data_if_available: Option<Role>,
    ) {
        let Some(guild) = self.guild_view(&ctx, guild_id).await else {
            return;
        };
        let event = RoleDeleteEvent {
            guild,
            role_id: from_role(removed_role_id),
        };
        report("role_delete", self.engine.on_role_delete(event).await);
    }

    #[instrument(skip(self, ctx))]
    async fn webhook_update(
        &self,
        ctx: Context,
        guild_id: sid::GuildId,
        belongs_to_channel_id: sid::ChannelId,
    ) {
        let Some(guild) = self.guild_view(&ctx, guild_id).await else {
            return;
        };
        let event = WebhookUpdateEvent {
            guild,
            channel_id: from_channel(belongs_to_channel_id),
        };
        report("webhook_update", self.engine.on_webhook_update(event).await);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intents_cover_moderation_events() {
        let intents = RxtHandler::intents();
        assert!(intents.contains(GatewayIntents::GUILD_MEMBERS));
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(intents.contains(GatewayIntents::GUILD_MODERATION));
        assert!(intents.contains(GatewayIntents::GUILD_WEBHOOKS));
        assert!(!intents.contains(GatewayIntents::DIRECT_MESSAGES));
    }
}
