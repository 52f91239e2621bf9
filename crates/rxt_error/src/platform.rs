//! Chat platform API error types.
//!
//! Every call the engine makes against the chat platform (role edits, channel
//! creation, audit-log reads) reports failures through [`PlatformError`].
//! Adapters classify their transport errors into a [`PlatformErrorKind`] so the
//! engine can decide between "skip silently" and "log and degrade".

/// Platform error variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum PlatformErrorKind {
    /// The bot lacks the permission required for the call.
    #[display("Permission denied: {_0}")]
    PermissionDenied(String),

    /// The platform rate-limited the call.
    #[display("Rate limited: retry after {_0}s")]
    RateLimited(u64),

    /// The referenced guild, member, role, channel or webhook does not exist.
    #[display("Not found: {_0}")]
    NotFound(String),

    /// The target sits above the bot in the role hierarchy.
    #[display("Role hierarchy violation: {_0}")]
    Hierarchy(String),

    /// Any other HTTP or gateway failure.
    #[display("HTTP error: {_0}")]
    Http(String),

    /// The call did not complete in time.
    #[display("Timed out: {_0}")]
    Timeout(String),

    /// The request was rejected as malformed.
    #[display("Invalid input: {_0}")]
    InvalidInput(String),
}

/// Platform error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Platform Error: {} at line {} in {}", kind, line, file)]
pub struct PlatformError {
    /// The specific error kind
    pub kind: PlatformErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl PlatformError {
    /// Create a new PlatformError with automatic location tracking.
    ///
    /// # Example
    /// ```
    /// use rxt_error::{PlatformError, PlatformErrorKind};
    ///
    /// let err = PlatformError::new(PlatformErrorKind::NotFound("role 42".to_string()));
    /// assert!(err.is_not_found());
    /// ```
    #[track_caller]
    pub fn new(kind: PlatformErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &PlatformErrorKind {
        &self.kind
    }

    /// Whether the target of the call no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, PlatformErrorKind::NotFound(_))
    }
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
