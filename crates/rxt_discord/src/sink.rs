//! Security log sink that posts to each guild's log channel.

use async_trait::async_trait;
use rxt_config::ConfigStore;
use rxt_core::{GuildId, LogCategory};
use rxt_security::{LogSink, TracingLogSink};
use serenity::http::Http;
use std::sync::Arc;
use tracing::debug;

use crate::conversions::to_channel;

/// Writes every line to tracing and, when the guild has a log channel
/// configured, to that channel.
pub struct DiscordLogSink {
    http: Arc<Http>,
    configs: Arc<dyn ConfigStore>,
}

impl DiscordLogSink {
    /// Create a sink reading log channels from `configs`.
    pub fn new(http: Arc<Http>, configs: Arc<dyn ConfigStore>) -> Self {
        Self { http, configs }
    }
}

/// Channel text for one log line.
pub fn format_log_line(category: LogCategory, message: &str) -> String {
    format!("**[{}]** {}", category, message)
}

#[async_trait]
impl LogSink for DiscordLogSink {
    async fn log_action(&self, guild_id: GuildId, category: LogCategory, message: &str) {
        TracingLogSink.log_action(guild_id, category, message).await;

        let channel_id = match self.configs.get_config(guild_id).await {
            Ok(config) => config.log_channel_id,
            Err(e) => {
                debug!(guild_id = %guild_id, error = %e, "Log channel lookup failed");
                None
            }
        };
        let Some(channel_id) = channel_id else {
            return;
        };

        let http: &Http = &self.http;
        if let Err(e) = to_channel(channel_id)
            .say(http, format_log_line(category, message))
            .await
        {
            debug!(
                guild_id = %guild_id,
                channel_id = %channel_id,
                error = %e,
                "Failed to post security log line"
            );
        }
    }
}
