//! Guild permission bits.
//!
//! Only the bits the engine reasons about are named here. Values match the
//! Discord permission bitfield so adapters can pass raw bits straight through.

use serde::{Deserialize, Serialize};

/// A raw permission bitfield.
///
/// # Examples
///
/// ```
/// use rxt_core::Permissions;
///
/// let perms = Permissions::from_bits(Permissions::ADMINISTRATOR | Permissions::SEND_MESSAGES);
/// assert!(perms.is_elevated());
/// assert!(!Permissions::from_bits(Permissions::SEND_MESSAGES).is_elevated());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
#[display("{:#x}", _0)]
pub struct Permissions(u64);

impl Permissions {
    /// Create instant invites.
    pub const CREATE_INSTANT_INVITE: u64 = 1 << 0;
    /// Kick members.
    pub const KICK_MEMBERS: u64 = 1 << 1;
    /// Ban members.
    pub const BAN_MEMBERS: u64 = 1 << 2;
    /// Bypass every permission check.
    pub const ADMINISTRATOR: u64 = 1 << 3;
    /// Create, edit and delete channels.
    pub const MANAGE_CHANNELS: u64 = 1 << 4;
    /// Edit guild settings.
    pub const MANAGE_GUILD: u64 = 1 << 5;
    /// Add reactions.
    pub const ADD_REACTIONS: u64 = 1 << 6;
    /// View a channel.
    pub const VIEW_CHANNEL: u64 = 1 << 10;
    /// Send messages.
    pub const SEND_MESSAGES: u64 = 1 << 11;
    /// Delete other members' messages.
    pub const MANAGE_MESSAGES: u64 = 1 << 13;
    /// Post embeds through links.
    pub const EMBED_LINKS: u64 = 1 << 14;
    /// Upload attachments.
    pub const ATTACH_FILES: u64 = 1 << 15;
    /// Read message history.
    pub const READ_MESSAGE_HISTORY: u64 = 1 << 16;
    /// Use the broadcast mentions.
    pub const MENTION_EVERYONE: u64 = 1 << 17;
    /// Join voice channels.
    pub const CONNECT: u64 = 1 << 20;
    /// Speak in voice channels.
    pub const SPEAK: u64 = 1 << 21;
    /// Create, edit and delete roles.
    pub const MANAGE_ROLES: u64 = 1 << 28;
    /// Create, edit and delete webhooks.
    pub const MANAGE_WEBHOOKS: u64 = 1 << 29;
    /// Time out members.
    pub const MODERATE_MEMBERS: u64 = 1 << 40;

    /// Bits whose grant or removal counts as a privileged state change.
    pub const ELEVATED: u64 = Self::ADMINISTRATOR
        | Self::MANAGE_GUILD
        | Self::MANAGE_ROLES
        | Self::MANAGE_CHANNELS
        | Self::MANAGE_WEBHOOKS
        | Self::BAN_MEMBERS
        | Self::KICK_MEMBERS
        | Self::MENTION_EVERYONE;

    /// Allowed in the quarantine channel: view, send, read history.
    pub const QUARANTINE_ALLOW: u64 =
        Self::VIEW_CHANNEL | Self::SEND_MESSAGES | Self::READ_MESSAGE_HISTORY;

    /// Denied to the quarantine role everywhere.
    pub const QUARANTINE_DENY: u64 = Self::EMBED_LINKS
        | Self::ATTACH_FILES
        | Self::MENTION_EVERYONE
        | Self::ADD_REACTIONS
        | Self::CONNECT
        | Self::SPEAK
        | Self::CREATE_INSTANT_INVITE;

    /// Wrap raw bits.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether every bit of `flags` is set.
    pub const fn contains(self, flags: u64) -> bool {
        self.0 & flags == flags
    }

    /// Whether the bitfield grants any elevated permission.
    pub const fn is_elevated(self) -> bool {
        self.0 & Self::ELEVATED != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarantine_sets_are_disjoint() {
        assert_eq!(Permissions::QUARANTINE_ALLOW & Permissions::QUARANTINE_DENY, 0);
    }

    #[test]
    fn test_moderate_members_alone_is_not_elevated() {
        assert!(!Permissions::from_bits(Permissions::MODERATE_MEMBERS).is_elevated());
        assert!(Permissions::from_bits(Permissions::MANAGE_ROLES).is_elevated());
    }
}
