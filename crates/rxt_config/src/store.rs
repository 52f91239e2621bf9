//! Guild configuration stores.
//!
//! The engine reads a guild's [`SecurityConfig`] before every detector
//! evaluation, so stores keep an in-memory authoritative copy: a write is
//! visible to the very next read, and reads never touch the disk.

use crate::SecurityConfig;
use async_trait::async_trait;
use rxt_core::GuildId;
use rxt_error::RxtResult;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// In-place edit applied atomically by [`ConfigStore::update_config`].
pub type ConfigMutation = Box<dyn FnOnce(&mut SecurityConfig) + Send>;

/// Read/write access to per-guild security configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Configuration for `guild_id`, or the store's defaults if the guild has none.
    async fn get_config(&self, guild_id: GuildId) -> RxtResult<SecurityConfig>;

    /// Replace the configuration for `guild_id`.
    async fn set_config(&self, guild_id: GuildId, config: SecurityConfig) -> RxtResult<()>;

    /// Apply `mutation` under the store's write lock and return the result.
    ///
    /// Concurrent updates to the same guild never lose each other's changes.
    async fn update_config(
        &self,
        guild_id: GuildId,
        mutation: ConfigMutation,
    ) -> RxtResult<SecurityConfig>;
}

/// Volatile configuration store.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    configs: Arc<RwLock<HashMap<GuildId, SecurityConfig>>>,
    defaults: SecurityConfig,
}

impl MemoryConfigStore {
    /// Create an empty store handing out [`SecurityConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store handing out `defaults` for unknown guilds.
    pub fn with_defaults(defaults: SecurityConfig) -> Self {
        Self {
            configs: Arc::new(RwLock::new(HashMap::new())),
            defaults,
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get_config(&self, guild_id: GuildId) -> RxtResult<SecurityConfig> {
        let configs = self.configs.read().await;
        Ok(configs
            .get(&guild_id)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone()))
    }

    #[instrument(skip(self, config), fields(guild_id = %guild_id))]
    async fn set_config(&self, guild_id: GuildId, config: SecurityConfig) -> RxtResult<()> {
        debug!("Storing guild configuration in memory");
        self.configs.write().await.insert(guild_id, config);
        Ok(())
    }

    #[instrument(skip(self, mutation), fields(guild_id = %guild_id))]
    async fn update_config(
        &self,
        guild_id: GuildId,
        mutation: ConfigMutation,
    ) -> RxtResult<SecurityConfig> {
        let mut configs = self.configs.write().await;
        let config = configs
            .entry(guild_id)
            .or_insert_with(|| self.defaults.clone());
        mutation(config);
        Ok(config.clone())
    }
}

/// Configuration store persisted as one JSON document.
///
/// All guilds live in a single map keyed by guild ID. Every write replaces the
/// file atomically; reads are served from memory.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    file_path: PathBuf,
    configs: Arc<RwLock<HashMap<GuildId, SecurityConfig>>>,
    defaults: SecurityConfig,
}

impl JsonConfigStore {
    /// Open the store at `file_path`, loading any existing document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    #[instrument(skip(file_path, defaults))]
    pub async fn open(
        file_path: impl Into<PathBuf>,
        defaults: SecurityConfig,
    ) -> RxtResult<Self> {
        let file_path = file_path.into();
        let configs: HashMap<GuildId, SecurityConfig> =
            crate::read_json(&file_path).await?.unwrap_or_default();
        info!(
            path = %file_path.display(),
            guilds = configs.len(),
            "Guild configuration loaded"
        );
        Ok(Self {
            file_path,
            configs: Arc::new(RwLock::new(configs)),
            defaults,
        })
    }

    /// Location of the backing document.
    pub fn file_path(&self) -> &std::path::Path {
        &self.file_path
    }
}

#[async_trait]
impl ConfigStore for JsonConfigStore {
    async fn get_config(&self, guild_id: GuildId) -> RxtResult<SecurityConfig> {
        let configs = self.configs.read().await;
        Ok(configs
            .get(&guild_id)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone()))
    }

    #[instrument(skip(self, config), fields(guild_id = %guild_id))]
    async fn set_config(&self, guild_id: GuildId, config: SecurityConfig) -> RxtResult<()> {
        let mut configs = self.configs.write().await;
        configs.insert(guild_id, config);
        crate::write_json(&self.file_path, &*configs).await?;
        debug!("Guild configuration persisted");
        Ok(())
    }

    #[instrument(skip(self, mutation), fields(guild_id = %guild_id))]
    async fn update_config(
        &self,
        guild_id: GuildId,
        mutation: ConfigMutation,
    ) -> RxtResult<SecurityConfig> {
        let mut configs = self.configs.write().await;
        let config = configs
            .entry(guild_id)
            .or_insert_with(|| self.defaults.clone());
        mutation(config);
        let updated = config.clone();
        crate::write_json(&self.file_path, &*configs).await?;
        debug!("Guild configuration updated");
        Ok(updated)
    }
}
