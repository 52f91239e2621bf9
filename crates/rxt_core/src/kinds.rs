//! Detector, violation and log-category taxonomies.

use serde::{Deserialize, Serialize};

/// A detector that can be toggled per guild.
///
/// # Examples
///
/// ```
/// use rxt_core::Detector;
/// use std::str::FromStr;
///
/// assert_eq!(Detector::from_str("mass_delete").unwrap(), Detector::MassDelete);
/// assert_eq!(Detector::RoleEscalation.to_string(), "role_escalation");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Detector {
    /// Join-rate and suspicious-account ejection.
    Raid,
    /// Channel and role deletion by untrusted actors.
    Nuke,
    /// Blocked link domains.
    Link,
    /// Per-user message rate.
    Spam,
    /// Broadcast mentions.
    Mention,
    /// Webhook creation by untrusted actors.
    Webhook,
    /// Grant or removal of elevated roles by untrusted actors.
    RoleEscalation,
    /// Per-user deletion rate.
    MassDelete,
}

/// Why a member was quarantined.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViolationType {
    /// Message burst above the spam threshold.
    Spam,
    /// Link to a blocked domain.
    Link,
    /// Broadcast mention.
    MassMention,
    /// Deletion burst above the mass-delete threshold.
    MassDelete,
    /// Untrusted grant or removal of an elevated role.
    RoleEscalation,
    /// Untrusted channel deletion.
    ChannelDelete,
    /// Untrusted role deletion.
    RoleDelete,
    /// Untrusted webhook creation.
    WebhookCreate,
    /// Applied by an administrator.
    Manual,
}

impl ViolationType {
    /// The detector responsible for this violation, if any.
    pub fn detector(self) -> Option<Detector> {
        match self {
            Self::Spam => Some(Detector::Spam),
            Self::Link => Some(Detector::Link),
            Self::MassMention => Some(Detector::Mention),
            Self::MassDelete => Some(Detector::MassDelete),
            Self::RoleEscalation => Some(Detector::RoleEscalation),
            Self::ChannelDelete | Self::RoleDelete => Some(Detector::Nuke),
            Self::WebhookCreate => Some(Detector::Webhook),
            Self::Manual => None,
        }
    }
}

/// Category attached to every log-sink line.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogCategory {
    /// A detector crossed its threshold or matched a pattern.
    DetectorTriggered,
    /// A member was quarantined.
    QuarantineApplied,
    /// A member's roles were restored.
    QuarantineRestored,
    /// A joining account was removed from the guild.
    RaidEjection,
    /// A privileged change was reverted.
    ChangeReverted,
    /// Guild security configuration changed.
    ConfigChanged,
    /// A platform action failed and was skipped.
    ActionFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_violation_maps_to_known_detector() {
        assert_eq!(ViolationType::ChannelDelete.detector(), Some(Detector::Nuke));
        assert_eq!(ViolationType::Manual.detector(), None);
    }

    #[test]
    fn test_detector_names_round_trip() {
        for detector in Detector::iter() {
            let name = detector.to_string();
            assert_eq!(name.parse::<Detector>().unwrap(), detector);
        }
    }
}
