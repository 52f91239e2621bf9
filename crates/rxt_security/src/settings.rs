//! Engine tuning that is fixed for the process lifetime.

use derive_getters::Getters;
use rxt_config::{QuarantineNaming, RxtConfig};
use std::time::Duration;

/// Process-wide engine settings.
///
/// Per-guild settings live in [`rxt_config::SecurityConfig`] and are re-read
/// on every event; these are read once at startup.
///
/// # Examples
///
/// ```
/// use rxt_security::EngineSettings;
/// use std::time::Duration;
///
/// let settings = EngineSettings::default()
///     .with_self_action_grace(Duration::ZERO)
///     .with_dm_notifications(false);
/// assert!(!settings.dm_notifications());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct EngineSettings {
    /// How long a self-action mark outlives the mutation
    self_action_grace: Duration,
    /// Maximum age of an attributable audit entry
    audit_lookback: Duration,
    /// Audit lookups slower than this fail closed
    audit_timeout: Duration,
    /// Entries fetched per audit lookup
    audit_fetch_limit: u8,
    /// Send direct messages on quarantine and release
    dm_notifications: bool,
    /// Names for lazily created quarantine resources
    naming: QuarantineNaming,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&RxtConfig::default())
    }
}

impl From<&RxtConfig> for EngineSettings {
    fn from(config: &RxtConfig) -> Self {
        Self {
            self_action_grace: config.self_action_grace(),
            audit_lookback: config.audit_lookback(),
            audit_timeout: config.audit_timeout(),
            audit_fetch_limit: *config.audit_fetch_limit(),
            dm_notifications: *config.dm_notifications(),
            naming: config.quarantine().clone(),
        }
    }
}
