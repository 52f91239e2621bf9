//! Snowflake identifier newtypes.
//!
//! Each identifier is a transparent `u64` so it serializes as a plain number and
//! cannot be confused with an identifier of another entity type.

use serde::{Deserialize, Serialize};

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
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
            derive_more::Display,
            derive_more::From,
        )]
        #[serde(transparent)]
        #[display("{}", _0)]
        pub struct $name(pub u64);

        impl $name {
            /// Create an identifier from its raw value.
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Raw snowflake value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }
    };
}

snowflake!(
    /// Guild (server) identifier.
    GuildId
);
snowflake!(
    /// User identifier. Members are addressed by their user identifier.
    UserId
);
snowflake!(
    /// Role identifier.
    RoleId
);
snowflake!(
    /// Channel or category identifier.
    ChannelId
);
snowflake!(
    /// Message identifier.
    MessageId
);
snowflake!(
    /// Webhook identifier.
    WebhookId
);

/// A member within a guild: the key for per-user detector and quarantine state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display("{}:{}", guild_id, user_id)]
pub struct MemberKey {
    /// Guild the member belongs to.
    pub guild_id: GuildId,
    /// The member's user identifier.
    pub user_id: UserId,
}

impl MemberKey {
    /// Create a member key.
    pub const fn new(guild_id: GuildId, user_id: UserId) -> Self {
        Self { guild_id, user_id }
    }
}
