//! RXT Security Bot - abuse detection and quarantine for Discord guilds.
//!
//! Loads layered configuration, opens the state files, reconciles persisted
//! quarantines and runs the gateway until interrupted.

use clap::Parser;
use rxt_config::{JsonConfigStore, RxtConfig};
use rxt_discord::{DiscordError, DiscordErrorKind, RxtBot};
use rxt_security::{JsonQuarantineStore, QuarantineStore};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the bot.
#[derive(Parser, Debug)]
#[command(name = "rxt-bot")]
#[command(about = "RXT Security - guild abuse detection and quarantine")]
#[command(version)]
struct Args {
    /// Configuration file; replaces the layered search when given
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory for guild configuration and the quarantine ledger
    #[arg(long, env = "RXT_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Validate configuration and state files, then exit
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting RXT security bot");
    let mut config = match &args.config {
        Some(path) => {
            info!(config_file = ?path, "Loading configuration");
            RxtConfig::from_file(path)?
        }
        None => RxtConfig::load()?,
    };
    if let Some(state_dir) = args.state_dir {
        config = config.with_state_dir(state_dir);
    }
    info!(state_dir = %config.state_dir().display(), "Configuration loaded");

    if args.dry_run {
        info!("DRY RUN MODE - gateway will not be started");
        JsonConfigStore::open(config.guild_config_path(), config.guild_defaults().clone())
            .await?;
        let ledger = JsonQuarantineStore::open(config.quarantine_path()).await?;
        let entries = ledger.load_all().await?;
        info!(quarantined = entries.len(), "State files validated");
        return Ok(());
    }

    let token = args
        .token
        .ok_or_else(|| DiscordError::new(DiscordErrorKind::InvalidToken))?;

    let mut bot = RxtBot::new(token, &config).await?;
    bot.start().await?;

    info!("RXT security bot stopped");
    Ok(())
}
