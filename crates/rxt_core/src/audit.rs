//! Audit-trail entries as seen by the trust resolver.

use crate::{RoleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The audit-log action types the engine queries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    /// Roles added to or removed from a member.
    MemberRoleUpdate,
    /// A channel was deleted.
    ChannelDelete,
    /// A role was deleted.
    RoleDelete,
    /// A webhook was created.
    WebhookCreate,
    /// A single message was deleted by someone other than its author.
    MessageDelete,
    /// Messages were deleted in bulk.
    MessageBulkDelete,
}

/// One audit-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct AuditEntry {
    action: AuditAction,
    actor_id: UserId,
    target_id: Option<u64>,
    created_at: DateTime<Utc>,
    reason: Option<String>,
    /// Roles granted, for member role updates
    #[serde(default)]
    roles_added: Vec<RoleId>,
    /// Roles revoked, for member role updates
    #[serde(default)]
    roles_removed: Vec<RoleId>,
}

impl AuditEntry {
    /// Create an audit entry.
    pub fn new(
        action: AuditAction,
        actor_id: UserId,
        target_id: Option<u64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            actor_id,
            target_id,
            created_at,
            reason: None,
            roles_added: Vec::new(),
            roles_removed: Vec::new(),
        }
    }

    /// Attach the role changes of a member role update.
    pub fn with_role_changes(mut self, added: Vec<RoleId>, removed: Vec<RoleId>) -> Self {
        self.roles_added = added;
        self.roles_removed = removed;
        self
    }

    /// Attach the reason the actor supplied.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Whether the entry concerns `target`. Entries without a target match anything.
    pub fn targets(&self, target: u64) -> bool {
        self.target_id.is_none_or(|id| id == target)
    }
}
