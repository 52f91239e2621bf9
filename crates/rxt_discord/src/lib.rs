//! Discord adapter for the RXT security engine.
//!
//! - [`SerenityPlatform`]: the engine's platform calls over Serenity's HTTP client
//! - [`DiscordLogSink`]: security log lines to tracing and the guild log channel
//! - [`RxtHandler`]: gateway events converted into engine events
//! - [`RxtBot`]: client wiring, startup reconciliation and lifecycle

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod conversions;
mod error;
mod handler;
mod platform;
mod sink;

pub use client::RxtBot;
pub use conversions::{
    MAX_TIMEOUT_DAYS, audit_action, clamp_timeout, classify_status, member_view,
    permission_overwrite, platform_error, role_changes, role_view, serenity_permissions, timestamp, user_view,
};
pub use error::{DiscordError, DiscordErrorKind, DiscordResult};
pub use handler::RxtHandler;
pub use platform::SerenityPlatform;
pub use sink::{DiscordLogSink, format_log_line};
