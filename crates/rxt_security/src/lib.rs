//! Abuse detection and quarantine lifecycle engine.
//!
//! The engine watches guild events for abuse patterns and responds by
//! ejecting joiners, deleting messages, reverting privileged changes and
//! quarantining offenders:
//!
//! - **Sliding windows**: message, join and deletion rates per key
//! - **Pattern checks**: blocked links, broadcast mentions, suspicious accounts
//! - **Trust resolution**: audit-trail attribution that fails closed
//! - **Quarantine**: role snapshots, escalating durations, scheduled restores
//!   and startup reconciliation
//!
//! Adapters implement [`GuildPlatform`] and [`LogSink`] and feed events into
//! the [`SecurityEngine`] handlers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod admin;
mod engine;
mod error;
mod events;
mod locks;
mod marker;
mod pattern;
mod platform;
mod quarantine;
mod settings;
mod trust;
mod whitelist;
mod window;

pub use admin::SecurityAdmin;
pub use engine::SecurityEngine;
pub use error::{SecurityError, SecurityErrorKind, SecurityResult};
pub use events::{
    ChannelDeleteEvent, EjectionReason, JoinEvent, MemberUpdateEvent, MessageDeleteEvent,
    MessageEvent, RoleDeleteEvent, Verdict, WebhookUpdateEvent,
};
pub use locks::KeyedLocks;
pub use marker::SelfActionMarker;
pub use pattern::{LinkDetector, RaidHeuristic, is_mass_mention};
pub use platform::{ChannelOverwrite, GuildPlatform, LogSink, OverwriteTarget, TracingLogSink};
pub use quarantine::{
    JsonQuarantineStore, MemoryQuarantineStore, QuarantineEntry, QuarantineManager,
    QuarantineOutcome, QuarantineStore, ReconcileReport, RestoreOutcome, RestoreReport,
    RestoreScheduler, RestoreTrigger, RoleSnapshot, ViolationRecord, escalated_duration,
    format_duration,
};
pub use settings::EngineSettings;
pub use trust::{ActorResolution, AuditEvidence, PrivilegedChange, TrustDecision, TrustResolver};
pub use whitelist::{TrustRule, is_whitelisted, trust_match, whitelist_match};
pub use window::SlidingWindow;
