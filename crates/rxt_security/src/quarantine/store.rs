//! Quarantine ledger persistence.
//!
//! The ledger is written on every change so a restart can restore members
//! whose quarantine expired while the process was down.

use crate::{QuarantineEntry, SecurityResult};
use async_trait::async_trait;
use rxt_core::MemberKey;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Durable storage for quarantine entries.
#[async_trait]
pub trait QuarantineStore: Send + Sync {
    /// Insert or replace the entry for its member.
    async fn save(&self, entry: &QuarantineEntry) -> SecurityResult<()>;

    /// Delete the entry for `key`, if any.
    async fn remove(&self, key: MemberKey) -> SecurityResult<()>;

    /// Every persisted entry.
    async fn load_all(&self) -> SecurityResult<Vec<QuarantineEntry>>;
}

/// Volatile quarantine store.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuarantineStore {
    entries: Arc<RwLock<HashMap<MemberKey, QuarantineEntry>>>,
}

impl MemoryQuarantineStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuarantineStore for MemoryQuarantineStore {
    async fn save(&self, entry: &QuarantineEntry) -> SecurityResult<()> {
        self.entries.write().await.insert(entry.key(), entry.clone());
        Ok(())
    }

    async fn remove(&self, key: MemberKey) -> SecurityResult<()> {
        self.entries.write().await.remove(&key);
        Ok(())
    }

    async fn load_all(&self) -> SecurityResult<Vec<QuarantineEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}

/// Quarantine store persisted as one JSON array.
#[derive(Debug, Clone)]
pub struct JsonQuarantineStore {
    file_path: PathBuf,
    entries: Arc<RwLock<HashMap<MemberKey, QuarantineEntry>>>,
}

impl JsonQuarantineStore {
    /// Open the store at `file_path`, loading any existing document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    #[instrument(skip(file_path))]
    pub async fn open(file_path: impl Into<PathBuf>) -> SecurityResult<Self> {
        let file_path = file_path.into();
        let stored: Vec<QuarantineEntry> = rxt_config::read_json(&file_path)
            .await?
            .unwrap_or_default();
        let entries: HashMap<_, _> = stored.into_iter().map(|e| (e.key(), e)).collect();
        info!(
            path = %file_path.display(),
            entries = entries.len(),
            "Quarantine ledger loaded"
        );
        Ok(Self {
            file_path,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Location of the backing document.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    async fn flush(&self, entries: &HashMap<MemberKey, QuarantineEntry>) -> SecurityResult<()> {
        let mut list: Vec<&QuarantineEntry> = entries.values().collect();
        list.sort_by_key(|e| e.key());
        rxt_config::write_json(&self.file_path, &list).await?;
        debug!(entries = list.len(), "Quarantine ledger persisted");
        Ok(())
    }
}

#[async_trait]
impl QuarantineStore for JsonQuarantineStore {
    #[instrument(skip(self, entry), fields(member = %entry.key()))]
    async fn save(&self, entry: &QuarantineEntry) -> SecurityResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.key(), entry.clone());
        self.flush(&entries).await
    }

    #[instrument(skip(self), fields(member = %key))]
    async fn remove(&self, key: MemberKey) -> SecurityResult<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(&key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }

    async fn load_all(&self) -> SecurityResult<Vec<QuarantineEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}
