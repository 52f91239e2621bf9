//! Actor attribution and trust decisions for privileged changes.
//!
//! Gateway events for deletions and role changes do not say who made them.
//! The resolver reads the audit trail, attributes the change to the actor of
//! the newest matching entry, and decides whether that actor is trusted. Every
//! failure to attribute (lookup error, timeout, no fresh entry) is untrusted.

use crate::{GuildPlatform, SelfActionMarker, TrustRule, trust_match};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use rxt_config::SecurityConfig;
use rxt_core::{AuditAction, AuditEntry, GuildView, MemberKey, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// A change that needs attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivilegedChange {
    /// Audit action recorded for this kind of change
    pub action: AuditAction,
    /// Raw ID of the changed entity, if the event carries one
    pub target_id: Option<u64>,
    /// Member affected by the change, checked against the self-action marker
    pub subject: Option<MemberKey>,
}

impl PrivilegedChange {
    /// Create a change description.
    pub fn new(action: AuditAction, target_id: Option<u64>) -> Self {
        Self {
            action,
            target_id,
            subject: None,
        }
    }

    /// Attach the affected member.
    pub fn with_subject(mut self, subject: MemberKey) -> Self {
        self.subject = Some(subject);
        self
    }
}

/// What the audit trail said about a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEvidence {
    /// A fresh matching entry was found.
    Entry(AuditEntry),
    /// No entry matched inside the lookback window.
    NoMatchingEntry,
    /// The lookup failed or timed out.
    LookupFailed(String),
}

/// The outcome of a trust check, kept for the log trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TrustDecision {
    actor_id: Option<UserId>,
    rule: Option<TrustRule>,
    evidence: AuditEvidence,
    decided_at: DateTime<Utc>,
}

impl TrustDecision {
    fn untrusted(actor_id: Option<UserId>, evidence: AuditEvidence) -> Self {
        Self {
            actor_id,
            rule: None,
            evidence,
            decided_at: Utc::now(),
        }
    }

    /// Whether the actor is trusted.
    pub fn trusted(&self) -> bool {
        self.rule.is_some()
    }

    /// One-line description for log lines.
    pub fn summary(&self) -> String {
        let actor = self
            .actor_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        match (&self.rule, &self.evidence) {
            (Some(rule), _) => format!("actor {} trusted as {}", actor, rule),
            (None, AuditEvidence::Entry(_)) => format!("actor {} untrusted", actor),
            (None, AuditEvidence::NoMatchingEntry) => "no matching audit entry".to_string(),
            (None, AuditEvidence::LookupFailed(e)) => format!("audit lookup failed: {}", e),
        }
    }
}

/// Result of resolving a privileged change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorResolution {
    /// The change was made by the engine itself and must not be acted on.
    SystemOriginated,
    /// The change was attributed (or failed to be) and a decision was made.
    Decided(TrustDecision),
}

/// Audit-trail based trust resolver.
#[derive(Clone)]
pub struct TrustResolver {
    platform: Arc<dyn GuildPlatform>,
    marker: SelfActionMarker,
    lookback: Duration,
    timeout: Duration,
    fetch_limit: u8,
}

impl std::fmt::Debug for TrustResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustResolver")
            .field("lookback", &self.lookback)
            .field("timeout", &self.timeout)
            .field("fetch_limit", &self.fetch_limit)
            .finish_non_exhaustive()
    }
}

impl TrustResolver {
    /// Create a resolver.
    pub fn new(
        platform: Arc<dyn GuildPlatform>,
        marker: SelfActionMarker,
        lookback: Duration,
        timeout: Duration,
        fetch_limit: u8,
    ) -> Self {
        Self {
            platform,
            marker,
            lookback,
            timeout,
            fetch_limit: fetch_limit.max(1),
        }
    }

    /// Attribute `change` and decide whether its actor is trusted.
    #[instrument(
        skip(self, guild, config),
        fields(guild_id = %guild.guild_id, action = %change.action)
    )]
    pub async fn resolve(
        &self,
        guild: &GuildView,
        config: &SecurityConfig,
        change: PrivilegedChange,
    ) -> ActorResolution {
        if let Some(subject) = change.subject.filter(|s| self.marker.is_marked(*s)) {
            debug!(member = %subject, "Change is an echo of an engine action");
            return ActorResolution::SystemOriginated;
        }

        let entry = match self.find_entry(guild, &change).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("No fresh audit entry, failing closed");
                return ActorResolution::Decided(TrustDecision::untrusted(
                    None,
                    AuditEvidence::NoMatchingEntry,
                ));
            }
            Err(reason) => {
                warn!(reason = %reason, "Audit lookup failed, failing closed");
                return ActorResolution::Decided(TrustDecision::untrusted(
                    None,
                    AuditEvidence::LookupFailed(reason),
                ));
            }
        };

        let actor_id = *entry.actor_id();
        if actor_id == guild.bot_user_id
            || self
                .marker
                .is_marked(MemberKey::new(guild.guild_id, actor_id))
        {
            debug!(actor = %actor_id, "Change made by the engine");
            return ActorResolution::SystemOriginated;
        }

        ActorResolution::Decided(self.decide(guild, config, actor_id, entry).await)
    }

    /// Trust rule for `actor_id`, fetching the member to check role-based rules.
    async fn decide(
        &self,
        guild: &GuildView,
        config: &SecurityConfig,
        actor_id: UserId,
        entry: AuditEntry,
    ) -> TrustDecision {
        let rule = if actor_id == guild.owner_id {
            Some(TrustRule::Owner)
        } else {
            match self.platform.member(guild.guild_id, actor_id).await {
                Ok(member) => trust_match(guild, config, &member),
                Err(e) => {
                    debug!(actor = %actor_id, error = %e, "Actor lookup failed, checking user whitelist only");
                    config
                        .whitelist_users
                        .contains(&actor_id)
                        .then_some(TrustRule::WhitelistedUser)
                }
            }
        };

        debug!(actor = %actor_id, ?rule, "Trust decided");
        TrustDecision {
            actor_id: Some(actor_id),
            rule,
            evidence: AuditEvidence::Entry(entry),
            decided_at: Utc::now(),
        }
    }

    async fn find_entry(
        &self,
        guild: &GuildView,
        change: &PrivilegedChange,
    ) -> Result<Option<AuditEntry>, String> {
        let lookup = self
            .platform
            .audit_entries(guild.guild_id, change.action, self.fetch_limit);
        let entries = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(entries)) => entries,
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => return Err(format!("timed out after {:?}", self.timeout)),
        };

        let lookback = chrono::Duration::from_std(self.lookback)
            .unwrap_or_else(|_| chrono::Duration::seconds(15));
        let cutoff = Utc::now() - lookback;
        Ok(entries.into_iter().find(|entry| {
            *entry.action() == change.action
                && *entry.created_at() >= cutoff
                && change.target_id.is_none_or(|target| entry.targets(target))
        }))
    }
}
