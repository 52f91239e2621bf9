//! Process-level settings.
//!
//! This module provides TOML-based configuration for the bot process. The
//! configuration system supports:
//! - Bundled defaults (include_str! from rxt.toml)
//! - User overrides (~/.config/rxt/rxt.toml, then ./rxt.toml)
//! - Environment overrides (`RXT__STATE_DIR=/var/lib/rxt`)

use crate::SecurityConfig;
use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use rxt_error::{ConfigError, RxtError, RxtResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../rxt.toml");

/// Names used when the quarantine role, category and channel are created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct QuarantineNaming {
    /// Name of the restricted role
    #[serde(default = "default_role_name")]
    role_name: String,
    /// Name of the category holding the quarantine channel
    #[serde(default = "default_category_name")]
    category_name: String,
    /// Name of the quarantine text channel
    #[serde(default = "default_channel_name")]
    channel_name: String,
}

fn default_role_name() -> String {
    "Quarantined".to_string()
}

fn default_category_name() -> String {
    "Quarantine".to_string()
}

fn default_channel_name() -> String {
    "quarantine".to_string()
}

impl Default for QuarantineNaming {
    fn default() -> Self {
        Self {
            role_name: default_role_name(),
            category_name: default_category_name(),
            channel_name: default_channel_name(),
        }
    }
}

/// Top-level process configuration.
///
/// # Example
///
/// ```no_run
/// use rxt_config::RxtConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RxtConfig::load()?;
/// println!("state lives in {}", config.state_dir().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct RxtConfig {
    /// Directory for the JSON state documents
    #[serde(default = "default_state_dir")]
    state_dir: PathBuf,

    /// Self-action marker lifetime after a system-driven mutation, in milliseconds
    #[serde(default = "default_self_action_grace_ms")]
    self_action_grace_ms: u64,

    /// Maximum age of an audit entry attributed to the current event
    #[serde(default = "default_audit_lookback_secs")]
    audit_lookback_secs: u64,

    /// Audit lookups slower than this fail closed
    #[serde(default = "default_audit_timeout_ms")]
    audit_timeout_ms: u64,

    /// Entries fetched per audit lookup
    #[serde(default = "default_audit_fetch_limit")]
    audit_fetch_limit: u8,

    /// Send best-effort direct messages on quarantine and release
    #[serde(default = "default_dm_notifications")]
    dm_notifications: bool,

    /// Quarantine resource names
    #[serde(default)]
    quarantine: QuarantineNaming,

    /// Starting configuration for unconfigured guilds
    #[serde(default)]
    guild_defaults: SecurityConfig,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".rxt")
}

fn default_self_action_grace_ms() -> u64 {
    3000
}

fn default_audit_lookback_secs() -> u64 {
    15
}

fn default_audit_timeout_ms() -> u64 {
    5000
}

fn default_audit_fetch_limit() -> u8 {
    5
}

fn default_dm_notifications() -> bool {
    true
}

impl Default for RxtConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            self_action_grace_ms: default_self_action_grace_ms(),
            audit_lookback_secs: default_audit_lookback_secs(),
            audit_timeout_ms: default_audit_timeout_ms(),
            audit_fetch_limit: default_audit_fetch_limit(),
            dm_notifications: default_dm_notifications(),
            quarantine: QuarantineNaming::default(),
            guild_defaults: SecurityConfig::default(),
        }
    }
}

impl RxtConfig {
    /// Load configuration with precedence: env > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> RxtResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/rxt/rxt.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("rxt").required(false))
            .add_source(Environment::with_prefix("RXT").separator("__"));

        Self::finish(builder)
    }

    /// Load configuration from a specific file layered over the bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> RxtResult<Self> {
        debug!("Loading configuration from file");

        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("RXT").separator("__"));

        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> RxtResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| {
                RxtError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                RxtError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.guild_defaults.validate()?;
        Ok(config)
    }

    /// Override the state directory (command-line flag).
    pub fn with_state_dir(mut self, state_dir: impl Into<PathBuf>) -> Self {
        self.state_dir = state_dir.into();
        self
    }

    /// Path of the guild configuration document.
    pub fn guild_config_path(&self) -> PathBuf {
        self.state_dir.join("guild_configs.json")
    }

    /// Path of the quarantine ledger document.
    pub fn quarantine_path(&self) -> PathBuf {
        self.state_dir.join("quarantine.json")
    }

    /// Self-action marker lifetime.
    pub fn self_action_grace(&self) -> Duration {
        Duration::from_millis(self.self_action_grace_ms)
    }

    /// Audit lookback window.
    pub fn audit_lookback(&self) -> Duration {
        Duration::from_secs(self.audit_lookback_secs)
    }

    /// Audit lookup timeout.
    pub fn audit_timeout(&self) -> Duration {
        Duration::from_millis(self.audit_timeout_ms)
    }
}
