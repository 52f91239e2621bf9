//! Read-only views of guilds, members and roles.
//!
//! Platform adapters convert their native models into these views before
//! handing events to the engine, so the engine never touches SDK types.

use crate::{GuildId, Permissions, RoleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The guild facts every check needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildView {
    /// Guild identifier.
    pub guild_id: GuildId,
    /// Current owner.
    pub owner_id: UserId,
    /// The engine's own account in this guild.
    pub bot_user_id: UserId,
}

impl GuildView {
    /// Create a guild view.
    pub fn new(guild_id: GuildId, owner_id: UserId, bot_user_id: UserId) -> Self {
        Self {
            guild_id,
            owner_id,
            bot_user_id,
        }
    }
}

/// A member as seen at event time.
///
/// # Examples
///
/// ```
/// use rxt_core::{MemberViewBuilder, RoleId, UserId};
///
/// let member = MemberViewBuilder::default()
///     .user_id(UserId::new(10))
///     .role_ids(vec![RoleId::new(1)])
///     .display_name("alice")
///     .build()
///     .unwrap();
/// assert!(!member.is_bot);
/// assert!(member.has_any_role([RoleId::new(1)].iter()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct MemberView {
    /// User identifier.
    pub user_id: UserId,
    /// Roles currently held, excluding the implicit default role.
    #[builder(default)]
    pub role_ids: Vec<RoleId>,
    /// Whether the account is a bot.
    #[builder(default)]
    pub is_bot: bool,
    /// Nickname if set, otherwise the global name or username.
    #[builder(default)]
    pub display_name: String,
    /// Account creation time.
    #[builder(default = "Utc::now()")]
    pub account_created: DateTime<Utc>,
}

impl MemberView {
    /// Whether the member holds any of `roles`.
    pub fn has_any_role<'a>(&self, mut roles: impl Iterator<Item = &'a RoleId>) -> bool {
        roles.any(|role| self.role_ids.contains(role))
    }

    /// Whole days since the account was created.
    pub fn account_age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.account_created).num_days()
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleView {
    /// Role identifier.
    pub id: RoleId,
    /// Role name.
    pub name: String,
    /// Guild-level permissions.
    pub permissions: Permissions,
    /// Position in the hierarchy.
    pub position: i64,
    /// Managed by an integration (cannot be assigned manually).
    pub managed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_account_age_days() {
        let now = Utc::now();
        let member = MemberViewBuilder::default()
            .user_id(UserId::new(1))
            .account_created(now - Duration::days(3))
            .build()
            .unwrap();
        assert_eq!(member.account_age_days(now), 3);
    }
}
