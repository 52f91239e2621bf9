//! Discord adapter error types.
//!
//! Failures while wiring the bot (token, gateway connection, state files) are
//! reported through [`DiscordError`]. Failures of individual API calls made
//! on behalf of the engine are classified into a
//! [`rxt_error::PlatformErrorKind`] instead.

use derive_getters::Getters;
use rxt_error::RxtError;
use rxt_security::SecurityError;

/// Discord error variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum DiscordErrorKind {
    /// Serenity API error (e.g., HTTP error, gateway error, rate limit).
    #[display("Serenity API error: {_0}")]
    SerenityError(String),

    /// Connection to Discord gateway failed.
    #[display("Connection failed: {_0}")]
    ConnectionFailed(String),

    /// Bot token is missing, invalid or expired.
    #[display("Invalid or missing bot token")]
    InvalidToken,

    /// Configuration error (missing env vars, invalid settings).
    #[display("Configuration error: {_0}")]
    ConfigurationError(String),

    /// The security engine failed to start.
    #[display("Engine error: {_0}")]
    EngineError(String),
}

/// Discord error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error, Getters)]
#[display("Discord Error: {} at line {} in {}", kind, line, file)]
pub struct DiscordError {
    kind: DiscordErrorKind,
    line: u32,
    file: &'static str,
}

impl DiscordError {
    /// Create a new DiscordError with automatic location tracking.
    ///
    /// # Example
    /// ```
    /// use rxt_discord::{DiscordError, DiscordErrorKind};
    ///
    /// let err = DiscordError::new(DiscordErrorKind::InvalidToken);
    /// assert_eq!(*err.kind(), DiscordErrorKind::InvalidToken);
    /// ```
    #[track_caller]
    pub fn new(kind: DiscordErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for Discord operations.
pub type DiscordResult<T> = Result<T, DiscordError>;

impl From<serenity::Error> for DiscordError {
    #[track_caller]
    fn from(err: serenity::Error) -> Self {
        DiscordError::new(DiscordErrorKind::SerenityError(err.to_string()))
    }
}

impl From<RxtError> for DiscordError {
    #[track_caller]
    fn from(err: RxtError) -> Self {
        DiscordError::new(DiscordErrorKind::ConfigurationError(err.to_string()))
    }
}

impl From<SecurityError> for DiscordError {
    #[track_caller]
    fn from(err: SecurityError) -> Self {
        DiscordError::new(DiscordErrorKind::EngineError(err.to_string()))
    }
}
