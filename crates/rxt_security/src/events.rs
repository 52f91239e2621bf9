//! Engine inputs and outputs.
//!
//! Platform adapters translate gateway events into these structs; every
//! handler on [`crate::SecurityEngine`] answers with a [`Verdict`].

use crate::{QuarantineOutcome, TrustDecision};
use rxt_core::{ChannelId, GuildView, MemberView, MessageId, RoleId, UserId, ViolationType};

/// A message was posted in a guild channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Guild the message was posted in
    pub guild: GuildView,
    /// Channel the message was posted in
    pub channel_id: ChannelId,
    /// The message
    pub message_id: MessageId,
    /// The author as a member of the guild
    pub author: MemberView,
    /// Message text
    pub content: String,
    /// Whether the platform resolved an everyone/here mention
    pub mentions_everyone: bool,
}

/// A member joined a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEvent {
    /// Guild joined
    pub guild: GuildView,
    /// The new member
    pub member: MemberView,
}

/// A member's roles or profile changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberUpdateEvent {
    /// Guild of the member
    pub guild: GuildView,
    /// Roles before the change, if the adapter knew them
    pub before_roles: Option<Vec<RoleId>>,
    /// The member after the change
    pub after: MemberView,
}

/// One or more messages were deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDeleteEvent {
    /// Guild of the channel
    pub guild: GuildView,
    /// Channel the messages were deleted from
    pub channel_id: ChannelId,
    /// Deleted messages; more than one for a bulk delete
    pub message_ids: Vec<MessageId>,
    /// Author of the deleted message, if the adapter knew it
    pub author_id: Option<UserId>,
}

/// A channel or category was deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDeleteEvent {
    /// Guild of the channel
    pub guild: GuildView,
    /// The deleted channel
    pub channel_id: ChannelId,
    /// Its name, for log lines
    pub name: String,
}

/// A role was deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDeleteEvent {
    /// Guild of the role
    pub guild: GuildView,
    /// The deleted role
    pub role_id: RoleId,
}

/// A channel's webhooks changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookUpdateEvent {
    /// Guild of the channel
    pub guild: GuildView,
    /// Channel whose webhooks changed
    pub channel_id: ChannelId,
}

/// Why a joining member was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum EjectionReason {
    /// Joins inside the raid window exceeded the threshold.
    #[display("join rate exceeded ({} joins)", joins)]
    JoinRate {
        /// Joins counted in the window, including this one
        joins: usize,
    },
    /// Young account with a generated-looking name.
    #[display("suspicious new account")]
    SuspiciousAccount,
}

/// What the engine did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The event was not evaluated (detector disabled, irrelevant change).
    Ignored(&'static str),
    /// The member is whitelisted; no detector ran.
    Whitelisted,
    /// The event echoes an action taken by the engine itself.
    Suppressed,
    /// The actor of a privileged change is trusted.
    Trusted(TrustDecision),
    /// Every detector ran and none triggered.
    Clean,
    /// An offending message was deleted and its author quarantined.
    MessageRemoved {
        /// The deleted message
        message_id: MessageId,
        /// Link or mass mention
        violation: ViolationType,
        /// The author's quarantine
        quarantine: QuarantineOutcome,
    },
    /// A member was quarantined.
    Quarantined(QuarantineOutcome),
    /// A joining member was kicked.
    Ejected {
        /// The kicked member
        user_id: UserId,
        /// Why
        reason: EjectionReason,
    },
    /// An untrusted role change was undone.
    Reverted {
        /// Who made the change, if attributed
        actor_id: Option<UserId>,
        /// The actor's quarantine, if one was applied
        quarantine: Option<QuarantineOutcome>,
    },
    /// A privileged change could not be attributed to anyone.
    Unattributed(TrustDecision),
}

impl Verdict {
    /// Whether the engine changed anything on the platform.
    pub fn is_enforcement(&self) -> bool {
        matches!(
            self,
            Self::MessageRemoved { .. }
                | Self::Quarantined(_)
                | Self::Ejected { .. }
                | Self::Reverted { .. }
        )
    }
}
