//! Security engine error types.

use rxt_error::{PlatformError, RxtError, RxtErrorKind, StorageError};

/// Specific security engine error conditions.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SecurityErrorKind {
    /// A platform call failed and the operation could not continue
    #[display("Platform call failed: {}", _0)]
    Platform(String),

    /// Persisting or loading engine state failed
    #[display("Storage error: {}", _0)]
    Storage(String),

    /// Configuration error
    #[display("Configuration error: {}", _0)]
    Configuration(String),

    /// The member has no active quarantine
    #[display("Member {} is not quarantined", _0)]
    NotQuarantined(String),

    /// The requested target cannot be acted on
    #[display("Invalid target '{}': {}", target, reason)]
    InvalidTarget {
        /// Target that was rejected
        target: String,
        /// Reason for rejection
        reason: String,
    },
}

/// Security error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Security Error: {} at line {} in {}", kind, line, file)]
pub struct SecurityError {
    /// The specific error kind
    pub kind: SecurityErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl SecurityError {
    /// Create a new security error with location tracking.
    #[track_caller]
    pub fn new(kind: SecurityErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &SecurityErrorKind {
        &self.kind
    }
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;

impl From<PlatformError> for SecurityError {
    #[track_caller]
    fn from(err: PlatformError) -> Self {
        SecurityError::new(SecurityErrorKind::Platform(err.kind().to_string()))
    }
}

impl From<StorageError> for SecurityError {
    #[track_caller]
    fn from(err: StorageError) -> Self {
        SecurityError::new(SecurityErrorKind::Storage(err.kind.to_string()))
    }
}

impl From<RxtError> for SecurityError {
    #[track_caller]
    fn from(err: RxtError) -> Self {
        let kind = match err.kind() {
            RxtErrorKind::Config(e) => SecurityErrorKind::Configuration(e.message.clone()),
            RxtErrorKind::Storage(e) => SecurityErrorKind::Storage(e.kind.to_string()),
            RxtErrorKind::Platform(e) => SecurityErrorKind::Platform(e.kind().to_string()),
        };
        SecurityError::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxt_error::{ConfigError, PlatformErrorKind, StorageErrorKind};

    #[test]
    fn test_platform_error_conversion_keeps_kind() {
        let err: SecurityError =
            PlatformError::new(PlatformErrorKind::PermissionDenied("kick".to_string())).into();
        assert!(matches!(err.kind(), SecurityErrorKind::Platform(msg) if msg.contains("kick")));
    }

    #[test]
    fn test_rxt_error_conversion() {
        let err: SecurityError = RxtError::from(ConfigError::new("bad threshold")).into();
        assert_eq!(
            err.kind(),
            &SecurityErrorKind::Configuration("bad threshold".to_string())
        );

        let err: SecurityError =
            RxtError::from(StorageError::new(StorageErrorKind::Unavailable("disk".into()))).into();
        assert!(matches!(err.kind(), SecurityErrorKind::Storage(_)));
    }
}
