//! Whitelist resolution.
//!
//! Whitelisted members bypass every detector. The same rules, plus the main
//! moderator role, decide whether an actor is trusted for privileged changes.

use rxt_config::SecurityConfig;
use rxt_core::{GuildView, MemberView};
use serde::{Deserialize, Serialize};

/// The rule that made a member trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum TrustRule {
    /// The member owns the guild.
    #[display("guild owner")]
    Owner,
    /// The user is on the whitelist.
    #[display("whitelisted user")]
    WhitelistedUser,
    /// The member holds a whitelisted role.
    #[display("whitelisted role")]
    WhitelistedRole,
    /// The account is a whitelisted bot.
    #[display("whitelisted bot")]
    WhitelistedBot,
    /// The member holds the main moderator role.
    #[display("main moderator")]
    ModeratorRole,
}

/// The whitelist rule `member` satisfies, if any.
///
/// Rules are checked in order: owner, whitelisted user, whitelisted bot,
/// whitelisted role.
pub fn whitelist_match(
    guild: &GuildView,
    config: &SecurityConfig,
    member: &MemberView,
) -> Option<TrustRule> {
    if member.user_id == guild.owner_id {
        return Some(TrustRule::Owner);
    }
    if config.whitelist_users.contains(&member.user_id) {
        return Some(TrustRule::WhitelistedUser);
    }
    if member.is_bot && config.whitelist_bots.contains(&member.user_id) {
        return Some(TrustRule::WhitelistedBot);
    }
    if member.has_any_role(config.whitelist_roles.iter()) {
        return Some(TrustRule::WhitelistedRole);
    }
    None
}

/// Whether `member` bypasses every detector.
pub fn is_whitelisted(guild: &GuildView, config: &SecurityConfig, member: &MemberView) -> bool {
    whitelist_match(guild, config, member).is_some()
}

/// The rule that makes `member` trusted for privileged changes, if any.
///
/// Trust extends the whitelist with the main moderator role.
pub fn trust_match(
    guild: &GuildView,
    config: &SecurityConfig,
    member: &MemberView,
) -> Option<TrustRule> {
    whitelist_match(guild, config, member).or_else(|| {
        config
            .main_moderator_role_id
            .filter(|role| member.role_ids.contains(role))
            .map(|_| TrustRule::ModeratorRole)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxt_core::{GuildId, MemberViewBuilder, RoleId, UserId};

    fn guild() -> GuildView {
        GuildView::new(GuildId::new(1), UserId::new(100), UserId::new(999))
    }

    fn member(user: u64, roles: &[u64], is_bot: bool) -> MemberView {
        MemberViewBuilder::default()
            .user_id(UserId::new(user))
            .role_ids(roles.iter().copied().map(RoleId::new).collect::<Vec<_>>())
            .is_bot(is_bot)
            .build()
            .unwrap()
    }

    #[test]
    fn test_owner_is_always_whitelisted() {
        let config = SecurityConfig::default();
        assert_eq!(
            whitelist_match(&guild(), &config, &member(100, &[], false)),
            Some(TrustRule::Owner)
        );
    }

    #[test]
    fn test_whitelist_rules() {
        let mut config = SecurityConfig::default();
        config.whitelist_user(UserId::new(5));
        config.whitelist_role(RoleId::new(50));
        config.whitelist_bot(UserId::new(7));

        assert_eq!(
            whitelist_match(&guild(), &config, &member(5, &[], false)),
            Some(TrustRule::WhitelistedUser)
        );
        assert_eq!(
            whitelist_match(&guild(), &config, &member(6, &[50], false)),
            Some(TrustRule::WhitelistedRole)
        );
        assert_eq!(
            whitelist_match(&guild(), &config, &member(7, &[], true)),
            Some(TrustRule::WhitelistedBot)
        );
        assert!(!is_whitelisted(&guild(), &config, &member(8, &[51], false)));
    }

    #[test]
    fn test_bot_whitelist_requires_bot_account() {
        let mut config = SecurityConfig::default();
        config.whitelist_bot(UserId::new(7));
        assert!(!is_whitelisted(&guild(), &config, &member(7, &[], false)));
    }

    #[test]
    fn test_moderator_role_trusted_but_not_whitelisted() {
        let mut config = SecurityConfig::default();
        config.main_moderator_role_id = Some(RoleId::new(77));
        let moderator = member(20, &[77], false);

        assert!(!is_whitelisted(&guild(), &config, &moderator));
        assert_eq!(
            trust_match(&guild(), &config, &moderator),
            Some(TrustRule::ModeratorRole)
        );
    }
}
