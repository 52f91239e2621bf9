//! Per-guild security configuration.
//!
//! One [`SecurityConfig`] exists per guild. Every field has a serde default so
//! partially written documents (and documents written by older versions) load
//! cleanly, and mutation goes through the explicit helpers below so every
//! change can be logged by the caller.

use rxt_core::{ChannelId, Detector, RoleId, UserId};
use rxt_error::{ConfigError, RxtResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Per-detector enable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorToggles {
    /// Join-rate and suspicious-account ejection
    #[serde(default = "default_true")]
    pub raid: bool,
    /// Channel and role deletion
    #[serde(default = "default_true")]
    pub nuke: bool,
    /// Blocked link domains
    #[serde(default = "default_true")]
    pub link: bool,
    /// Message rate
    #[serde(default = "default_true")]
    pub spam: bool,
    /// Broadcast mentions
    #[serde(default = "default_true")]
    pub mention: bool,
    /// Webhook creation
    #[serde(default = "default_true")]
    pub webhook: bool,
    /// Elevated role grants and removals
    #[serde(default = "default_true")]
    pub role_escalation: bool,
    /// Deletion rate
    #[serde(default = "default_true")]
    pub mass_delete: bool,
}

impl Default for DetectorToggles {
    fn default() -> Self {
        Self {
            raid: true,
            nuke: true,
            link: true,
            spam: true,
            mention: true,
            webhook: true,
            role_escalation: true,
            mass_delete: true,
        }
    }
}

/// Numeric settings that administrators can tune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// Joins tolerated per raid window
    RaidJoinCount,
    /// Raid window length
    RaidTimeWindowSecs,
    /// Accounts younger than this are candidates for the raid heuristic
    RaidMinAccountAgeDays,
    /// Messages tolerated per spam window
    SpamMsgThreshold,
    /// Spam window length
    SpamTimeWindowSecs,
    /// Deletions tolerated per mass-delete window
    MassDeleteThreshold,
    /// Mass-delete window length
    MassDeleteTimeWindowSecs,
    /// First-offence quarantine duration
    QuarantineBaseDurationSecs,
}

/// Security configuration for one guild.
///
/// # Examples
///
/// ```
/// use rxt_config::SecurityConfig;
/// use rxt_core::{Detector, UserId};
///
/// let mut config = SecurityConfig::default();
/// assert!(config.detector_enabled(Detector::Spam));
///
/// config.set_detector(Detector::Spam, false);
/// config.whitelist_user(UserId::new(42));
/// assert!(!config.detector_enabled(Detector::Spam));
/// assert!(config.whitelist_users.contains(&UserId::new(42)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Master switch for every detector
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Individual detector switches
    #[serde(default)]
    pub detectors: DetectorToggles,

    /// Users that bypass every detector
    #[serde(default)]
    pub whitelist_users: BTreeSet<UserId>,

    /// Roles whose holders bypass every detector
    #[serde(default)]
    pub whitelist_roles: BTreeSet<RoleId>,

    /// Bot accounts that bypass every detector
    #[serde(default)]
    pub whitelist_bots: BTreeSet<UserId>,

    /// Joins tolerated inside one raid window
    #[serde(default = "default_raid_join_count")]
    pub raid_join_count: u32,

    /// Raid window in seconds
    #[serde(default = "default_raid_time_window_secs")]
    pub raid_time_window_secs: u64,

    /// Minimum account age before the suspicious-name heuristic stops applying
    #[serde(default = "default_raid_min_account_age_days")]
    pub raid_min_account_age_days: u32,

    /// Messages tolerated inside one spam window
    #[serde(default = "default_spam_msg_threshold")]
    pub spam_msg_threshold: u32,

    /// Spam window in seconds
    #[serde(default = "default_spam_time_window_secs")]
    pub spam_time_window_secs: u64,

    /// Deletions tolerated inside one mass-delete window
    #[serde(default = "default_mass_delete_threshold")]
    pub mass_delete_threshold: u32,

    /// Mass-delete window in seconds
    #[serde(default = "default_mass_delete_time_window_secs")]
    pub mass_delete_time_window_secs: u64,

    /// Duration of a first quarantine; repeat offences multiply it
    #[serde(default = "default_quarantine_base_duration_secs")]
    pub quarantine_base_duration_secs: u64,

    /// Cached quarantine role, created on first use
    #[serde(default)]
    pub quarantine_role_id: Option<RoleId>,

    /// Cached quarantine channel, created on first use
    #[serde(default)]
    pub quarantine_channel_id: Option<ChannelId>,

    /// Cached quarantine category, created on first use
    #[serde(default)]
    pub quarantine_category_id: Option<ChannelId>,

    /// Holders of this role are trusted for privileged changes
    #[serde(default)]
    pub main_moderator_role_id: Option<RoleId>,

    /// Channel receiving log-sink lines
    #[serde(default)]
    pub log_channel_id: Option<ChannelId>,

    /// Link hosts that trigger the link detector (substring match)
    #[serde(default = "default_blocked_domains")]
    pub blocked_domains: Vec<String>,

    /// Link hosts that never trigger, even when a blocked entry matches
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_raid_join_count() -> u32 {
    10
}

fn default_raid_time_window_secs() -> u64 {
    10
}

fn default_raid_min_account_age_days() -> u32 {
    7
}

fn default_spam_msg_threshold() -> u32 {
    5
}

fn default_spam_time_window_secs() -> u64 {
    5
}

fn default_mass_delete_threshold() -> u32 {
    10
}

fn default_mass_delete_time_window_secs() -> u64 {
    10
}

fn default_quarantine_base_duration_secs() -> u64 {
    3600 // 1 hour
}

fn default_blocked_domains() -> Vec<String> {
    [
        "grabify.link",
        "iplogger.org",
        "iplogger.com",
        "2no.co",
        "blasze.com",
        "ps3cfw.com",
        "discord-nitro",
        "discordgift",
        "dlscord",
        "steamcommunlty",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_allowed_domains() -> Vec<String> {
    [
        "discord.com",
        "discord.gg",
        "discordapp.com",
        "youtube.com",
        "youtu.be",
        "github.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detectors: DetectorToggles::default(),
            whitelist_users: BTreeSet::new(),
            whitelist_roles: BTreeSet::new(),
            whitelist_bots: BTreeSet::new(),
            raid_join_count: default_raid_join_count(),
            raid_time_window_secs: default_raid_time_window_secs(),
            raid_min_account_age_days: default_raid_min_account_age_days(),
            spam_msg_threshold: default_spam_msg_threshold(),
            spam_time_window_secs: default_spam_time_window_secs(),
            mass_delete_threshold: default_mass_delete_threshold(),
            mass_delete_time_window_secs: default_mass_delete_time_window_secs(),
            quarantine_base_duration_secs: default_quarantine_base_duration_secs(),
            quarantine_role_id: None,
            quarantine_channel_id: None,
            quarantine_category_id: None,
            main_moderator_role_id: None,
            log_channel_id: None,
            blocked_domains: default_blocked_domains(),
            allowed_domains: default_allowed_domains(),
        }
    }
}

impl SecurityConfig {
    /// Whether `detector` runs for this guild. The master switch wins.
    pub fn detector_enabled(&self, detector: Detector) -> bool {
        if !self.enabled {
            return false;
        }
        let toggles = &self.detectors;
        match detector {
            Detector::Raid => toggles.raid,
            Detector::Nuke => toggles.nuke,
            Detector::Link => toggles.link,
            Detector::Spam => toggles.spam,
            Detector::Mention => toggles.mention,
            Detector::Webhook => toggles.webhook,
            Detector::RoleEscalation => toggles.role_escalation,
            Detector::MassDelete => toggles.mass_delete,
        }
    }

    /// Enable or disable a single detector.
    pub fn set_detector(&mut self, detector: Detector, enabled: bool) {
        let toggles = &mut self.detectors;
        let flag = match detector {
            Detector::Raid => &mut toggles.raid,
            Detector::Nuke => &mut toggles.nuke,
            Detector::Link => &mut toggles.link,
            Detector::Spam => &mut toggles.spam,
            Detector::Mention => &mut toggles.mention,
            Detector::Webhook => &mut toggles.webhook,
            Detector::RoleEscalation => &mut toggles.role_escalation,
            Detector::MassDelete => &mut toggles.mass_delete,
        };
        *flag = enabled;
    }

    /// Add a user to the whitelist. Returns false if already present.
    pub fn whitelist_user(&mut self, user_id: UserId) -> bool {
        self.whitelist_users.insert(user_id)
    }

    /// Remove a user from the whitelist. Returns false if absent.
    pub fn unwhitelist_user(&mut self, user_id: UserId) -> bool {
        self.whitelist_users.remove(&user_id)
    }

    /// Add a role to the whitelist. Returns false if already present.
    pub fn whitelist_role(&mut self, role_id: RoleId) -> bool {
        self.whitelist_roles.insert(role_id)
    }

    /// Remove a role from the whitelist. Returns false if absent.
    pub fn unwhitelist_role(&mut self, role_id: RoleId) -> bool {
        self.whitelist_roles.remove(&role_id)
    }

    /// Add a bot to the whitelist. Returns false if already present.
    pub fn whitelist_bot(&mut self, bot_id: UserId) -> bool {
        self.whitelist_bots.insert(bot_id)
    }

    /// Remove a bot from the whitelist. Returns false if absent.
    pub fn unwhitelist_bot(&mut self, bot_id: UserId) -> bool {
        self.whitelist_bots.remove(&bot_id)
    }

    /// Set a numeric threshold.
    ///
    /// # Errors
    ///
    /// Counts and window lengths must be positive and fit their field. The base
    /// quarantine duration may be zero (restore immediately).
    pub fn set_threshold(&mut self, threshold: Threshold, value: u64) -> RxtResult<()> {
        if value == 0 && threshold != Threshold::QuarantineBaseDurationSecs {
            return Err(ConfigError::new(format!("{:?} must be positive", threshold)).into());
        }
        let as_u32 = |value: u64| {
            u32::try_from(value)
                .map_err(|_| ConfigError::new(format!("{:?} out of range: {}", threshold, value)))
        };
        match threshold {
            Threshold::RaidJoinCount => self.raid_join_count = as_u32(value)?,
            Threshold::RaidTimeWindowSecs => self.raid_time_window_secs = value,
            Threshold::RaidMinAccountAgeDays => self.raid_min_account_age_days = as_u32(value)?,
            Threshold::SpamMsgThreshold => self.spam_msg_threshold = as_u32(value)?,
            Threshold::SpamTimeWindowSecs => self.spam_time_window_secs = value,
            Threshold::MassDeleteThreshold => self.mass_delete_threshold = as_u32(value)?,
            Threshold::MassDeleteTimeWindowSecs => self.mass_delete_time_window_secs = value,
            Threshold::QuarantineBaseDurationSecs => self.quarantine_base_duration_secs = value,
        }
        Ok(())
    }

    /// Check that every count and window is usable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid field.
    pub fn validate(&self) -> RxtResult<()> {
        let checks = [
            ("raid_join_count", u64::from(self.raid_join_count)),
            ("raid_time_window_secs", self.raid_time_window_secs),
            ("spam_msg_threshold", u64::from(self.spam_msg_threshold)),
            ("spam_time_window_secs", self.spam_time_window_secs),
            ("mass_delete_threshold", u64::from(self.mass_delete_threshold)),
            ("mass_delete_time_window_secs", self.mass_delete_time_window_secs),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::new(format!("{} must be positive", field)).into());
            }
        }
        Ok(())
    }

    /// Base quarantine duration.
    pub fn quarantine_base_duration(&self) -> Duration {
        Duration::from_secs(self.quarantine_base_duration_secs)
    }

    /// Spam window.
    pub fn spam_window(&self) -> Duration {
        Duration::from_secs(self.spam_time_window_secs)
    }

    /// Raid join window.
    pub fn raid_window(&self) -> Duration {
        Duration::from_secs(self.raid_time_window_secs)
    }

    /// Mass-delete window.
    pub fn mass_delete_window(&self) -> Duration {
        Duration::from_secs(self.mass_delete_time_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_switch_disables_every_detector() {
        let mut config = SecurityConfig::default();
        config.enabled = false;
        assert!(!config.detector_enabled(Detector::Raid));
        assert!(!config.detector_enabled(Detector::MassDelete));
    }

    #[test]
    fn test_set_threshold_rejects_zero_window() {
        let mut config = SecurityConfig::default();
        assert!(config.set_threshold(Threshold::SpamTimeWindowSecs, 0).is_err());
        assert_eq!(config.spam_time_window_secs, 5);
    }

    #[test]
    fn test_zero_base_duration_is_allowed() {
        let mut config = SecurityConfig::default();
        config
            .set_threshold(Threshold::QuarantineBaseDurationSecs, 0)
            .unwrap();
        assert_eq!(config.quarantine_base_duration(), Duration::ZERO);
    }

    #[test]
    fn test_threshold_out_of_u32_range() {
        let mut config = SecurityConfig::default();
        let result = config.set_threshold(Threshold::RaidJoinCount, u64::MAX);
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: SecurityConfig =
            serde_json::from_str(r#"{"spam_msg_threshold": 3, "detectors": {"link": false}}"#)
                .unwrap();
        assert_eq!(config.spam_msg_threshold, 3);
        assert_eq!(config.raid_join_count, 10);
        assert!(!config.detectors.link);
        assert!(config.detectors.spam);
        assert!(!config.blocked_domains.is_empty());
    }

    #[test]
    fn test_whitelist_helpers_report_changes() {
        let mut config = SecurityConfig::default();
        assert!(config.whitelist_role(RoleId::new(5)));
        assert!(!config.whitelist_role(RoleId::new(5)));
        assert!(config.unwhitelist_role(RoleId::new(5)));
        assert!(!config.unwhitelist_role(RoleId::new(5)));
    }
}
