//! Top-level error wrapper types.

use crate::{ConfigError, PlatformError, StorageError};

/// Foundation error enum covering every failure domain of the engine.
///
/// # Examples
///
/// ```
/// use rxt_error::{RxtError, StorageError, StorageErrorKind};
///
/// let err: RxtError = StorageError::new(StorageErrorKind::Unavailable("disk".into())).into();
/// assert!(format!("{}", err).contains("Storage Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum RxtErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Chat platform error
    #[from(PlatformError)]
    Platform(PlatformError),
}

/// RXT error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("RXT Error: {}", _0)]
pub struct RxtError(Box<RxtErrorKind>);

impl RxtError {
    /// Create a new error from a kind.
    pub fn new(kind: RxtErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RxtErrorKind {
        &self.0
    }
}

impl<T> From<T> for RxtError
where
    T: Into<RxtErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for RXT operations.
pub type RxtResult<T> = std::result::Result<T, RxtError>;
