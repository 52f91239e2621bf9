//! Conversions between Serenity models and engine types.
//!
//! The engine works on plain snowflakes and views; this module maps them to
//! and from Serenity's typed IDs, members, roles and audit-log actions, and
//! classifies Serenity failures into [`PlatformErrorKind`]s.

use chrono::{DateTime, Duration, Utc};
use rxt_core::{
    AuditAction, ChannelId, GuildId, MemberView, MessageId, Permissions, RoleId, RoleView, UserId,
    WebhookId,
};
use rxt_error::{PlatformError, PlatformErrorKind};
use rxt_security::{ChannelOverwrite, OverwriteTarget};
use serenity::http::HttpError;
use serenity::model::Timestamp;
use serenity::model::channel::{PermissionOverwrite, PermissionOverwriteType};
use serenity::model::guild::audit_log::{
    Action, AffectedRole, Change, ChannelAction, MemberAction, MessageAction, RoleAction,
    WebhookAction,
};
use serenity::model::guild::{Member, Role};
use serenity::model::id as sid;
use serenity::model::permissions::Permissions as SerenityPermissions;
use serenity::model::user::User;

/// Longest timeout Discord accepts.
pub const MAX_TIMEOUT_DAYS: i64 = 28;

pub(crate) fn to_guild(id: GuildId) -> sid::GuildId {
    sid::GuildId::new(id.get())
}

pub(crate) fn to_user(id: UserId) -> sid::UserId {
    sid::UserId::new(id.get())
}

pub(crate) fn to_role(id: RoleId) -> sid::RoleId {
    sid::RoleId::new(id.get())
}

pub(crate) fn to_channel(id: ChannelId) -> sid::ChannelId {
    sid::ChannelId::new(id.get())
}

pub(crate) fn to_message(id: MessageId) -> sid::MessageId {
    sid::MessageId::new(id.get())
}

pub(crate) fn to_webhook(id: WebhookId) -> sid::WebhookId {
    sid::WebhookId::new(id.get())
}

pub(crate) fn from_guild(id: sid::GuildId) -> GuildId {
    GuildId::new(id.get())
}

pub(crate) fn from_user(id: sid::UserId) -> UserId {
    UserId::new(id.get())
}

pub(crate) fn from_role(id: sid::RoleId) -> RoleId {
    RoleId::new(id.get())
}

pub(crate) fn from_channel(id: sid::ChannelId) -> ChannelId {
    ChannelId::new(id.get())
}

pub(crate) fn from_message(id: sid::MessageId) -> MessageId {
    MessageId::new(id.get())
}

/// Convert a Serenity timestamp to UTC.
pub fn timestamp(ts: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}

/// View of a user with the given guild roles and nickname.
pub fn user_view(user: &User, roles: &[sid::RoleId], nick: Option<&str>) -> MemberView {
    MemberView {
        user_id: from_user(user.id),
        role_ids: roles.iter().copied().map(from_role).collect(),
        is_bot: user.bot,
        display_name: nick.unwrap_or_else(|| user.display_name()).to_string(),
        account_created: timestamp(user.id.created_at()),
    }
}

/// View of a guild member.
pub fn member_view(member: &Member) -> MemberView {
    user_view(&member.user, &member.roles, member.nick.as_deref())
}

/// View of a guild role.
pub fn role_view(role: &Role) -> RoleView {
    RoleView {
        id: from_role(role.id),
        name: role.name.clone(),
        permissions: Permissions::from_bits(role.permissions.bits()),
        position: i64::from(role.position),
        managed: role.managed,
    }
}

/// Serenity permission set with the same bits.
pub fn serenity_permissions(permissions: Permissions) -> SerenityPermissions {
    SerenityPermissions::from_bits_truncate(permissions.bits())
}

/// Audit-log action type queried for `action`.
pub fn audit_action(action: AuditAction) -> Action {
    match action {
        AuditAction::MemberRoleUpdate => Action::Member(MemberAction::RoleUpdate),
        AuditAction::ChannelDelete => Action::Channel(ChannelAction::Delete),
        AuditAction::RoleDelete => Action::Role(RoleAction::Delete),
        AuditAction::WebhookCreate => Action::Webhook(WebhookAction::Create),
        AuditAction::MessageDelete => Action::Message(MessageAction::Delete),
        AuditAction::MessageBulkDelete => Action::Message(MessageAction::BulkDelete),
    }
}

/// Roles granted and revoked by a member role update's `$add`/`$remove` changes.
pub fn role_changes(changes: &[Change]) -> (Vec<RoleId>, Vec<RoleId>) {
    let ids = |roles: &Option<Vec<AffectedRole>>| -> Vec<RoleId> {
        roles
            .iter()
            .flatten()
            .map(|role| from_role(role.id))
            .collect()
    };
    let mut added = Vec::new();
    let mut removed = Vec::new();
    for change in changes {
        match change {
            Change::RolesAdded { new, .. } => added.extend(ids(new)),
            Change::RolesRemove { new, .. } => removed.extend(ids(new)),
            _ => {}
        }
    }
    (added, removed)
}

/// Serenity overwrite for `overwrite`. The everyone role shares the guild's ID.
pub fn permission_overwrite(guild_id: GuildId, overwrite: ChannelOverwrite) -> PermissionOverwrite {
    let kind = match overwrite.target {
        OverwriteTarget::Everyone => PermissionOverwriteType::Role(sid::RoleId::new(guild_id.get())),
        OverwriteTarget::Role(id) => PermissionOverwriteType::Role(to_role(id)),
        OverwriteTarget::Member(id) => PermissionOverwriteType::Member(to_user(id)),
    };
    PermissionOverwrite {
        allow: serenity_permissions(overwrite.allow),
        deny: serenity_permissions(overwrite.deny),
        kind,
    }
}

/// Clamp a timeout end to the longest timeout Discord accepts.
pub fn clamp_timeout(until: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    until.min(now + Duration::days(MAX_TIMEOUT_DAYS))
}

/// Classify an HTTP failure by status code.
pub fn classify_status(status: u16, message: String) -> PlatformErrorKind {
    match status {
        400 => PlatformErrorKind::InvalidInput(message),
        403 => PlatformErrorKind::PermissionDenied(message),
        404 => PlatformErrorKind::NotFound(message),
        429 => PlatformErrorKind::RateLimited(1),
        _ => PlatformErrorKind::Http(format!("{} ({})", message, status)),
    }
}

/// Convert a Serenity failure into a platform error.
#[track_caller]
pub fn platform_error(err: serenity::Error) -> PlatformError {
    let kind = match &err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => classify_status(
            response.status_code.as_u16(),
            response.error.message.clone(),
        ),
        other => PlatformErrorKind::Http(other.to_string()),
    };
    PlatformError::new(kind)
}
