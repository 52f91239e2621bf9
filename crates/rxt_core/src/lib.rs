//! Core data types for the RXT guild security engine.
//!
//! This crate provides the vocabulary shared by the configuration layer, the
//! detection engine and the platform adapters: snowflake identifiers, read-only
//! views of guilds, members and roles, permission bits, audit-trail entries and
//! the detector / violation taxonomies.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod ids;
mod kinds;
mod member;
mod permissions;

pub use audit::{AuditAction, AuditEntry};
pub use ids::{ChannelId, GuildId, MemberKey, MessageId, RoleId, UserId, WebhookId};
pub use kinds::{Detector, LogCategory, ViolationType};
pub use member::{GuildView, MemberView, MemberViewBuilder, RoleView};
pub use permissions::Permissions;
