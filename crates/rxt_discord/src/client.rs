//! Discord bot client setup and lifecycle management.
//!
//! [`RxtBot`] wires the security engine to Discord: it opens the state
//! stores, resolves the bot's own identity, reconciles persisted quarantines
//! and then runs the gateway until shutdown.

use crate::conversions::from_user;
use crate::{DiscordError, DiscordErrorKind, DiscordLogSink, DiscordResult, RxtHandler, SerenityPlatform};
use rxt_config::{ConfigStore, JsonConfigStore, RxtConfig};
use rxt_security::{EngineSettings, JsonQuarantineStore, SecurityEngine};
use serenity::Client;
use serenity::http::Http;
use std::sync::Arc;
use tracing::{info, instrument};

/// The RXT security bot.
///
/// # Example
/// ```no_run
/// use rxt_config::RxtConfig;
/// use rxt_discord::RxtBot;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let token = std::env::var("DISCORD_TOKEN")?;
///     let config = RxtConfig::load()?;
///
///     let mut bot = RxtBot::new(token, &config).await?;
///     bot.start().await?;
///     Ok(())
/// }
/// ```
pub struct RxtBot {
    /// Serenity client instance
    client: Client,
    /// Engine shared with the event handler
    engine: Arc<SecurityEngine>,
}

impl RxtBot {
    /// Create the bot.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The bot token is rejected
    /// - A state file exists but cannot be parsed
    /// - The Serenity client fails to initialize
    #[instrument(skip(token, config), fields(token_len = token.len()))]
    pub async fn new(token: String, config: &RxtConfig) -> DiscordResult<Self> {
        info!("Initializing RXT security bot");

        let http = Arc::new(Http::new(&token));
        let current = http
            .get_current_user()
            .await
            .map_err(|_| DiscordError::new(DiscordErrorKind::InvalidToken))?;
        let bot_user_id = from_user(current.id);
        info!(bot_user_id = %bot_user_id, "Bot identity resolved");

        let configs: Arc<dyn ConfigStore> = Arc::new(
            JsonConfigStore::open(config.guild_config_path(), config.guild_defaults().clone())
                .await?,
        );
        let store = Arc::new(JsonQuarantineStore::open(config.quarantine_path()).await?);
        let platform = Arc::new(SerenityPlatform::new(http.clone(), bot_user_id));
        let sink = Arc::new(DiscordLogSink::new(http, configs.clone()));

        let engine = Arc::new(SecurityEngine::new(
            platform.clone(),
            configs,
            store,
            sink,
            EngineSettings::from(config),
        ));

        let handler = RxtHandler::new(engine.clone(), platform);
        let intents = RxtHandler::intents();
        info!("Building Serenity client with intents: {:?}", intents);

        let client = Client::builder(&token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| {
                DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                    "Failed to build client: {}",
                    e
                )))
            })?;

        info!("Serenity client built successfully");

        Ok(Self { client, engine })
    }

    /// Reconcile persisted quarantines, then run the gateway.
    ///
    /// Blocks until the client shuts down. Pending restore timers are
    /// cancelled on exit; the next start reconciles them from disk.
    ///
    /// # Errors
    /// Returns an error if the quarantine ledger cannot be read or the
    /// client stops with a fatal error.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> DiscordResult<()> {
        let report = self.engine.reconcile().await?;
        info!(
            restored = report.restored,
            rescheduled = report.rescheduled,
            failed = report.failed,
            "Quarantine ledger reconciled"
        );

        info!("Starting Discord bot");
        let result = self.client.start().await.map_err(|e| {
            DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                "Client error: {}",
                e
            )))
        });
        self.engine.manager().shutdown();
        result
    }

    /// The engine, for administrative access.
    pub fn engine(&self) -> &Arc<SecurityEngine> {
        &self.engine
    }
}
