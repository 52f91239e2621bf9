//! Error types for the RXT guild security engine.
//!
//! This crate provides the foundation error types shared by every RXT crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use rxt_error::{ConfigError, RxtResult};
//!
//! fn load() -> RxtResult<String> {
//!     Err(ConfigError::new("missing state_dir"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod platform;
mod storage;

pub use config::ConfigError;
pub use error::{RxtError, RxtErrorKind, RxtResult};
pub use platform::{PlatformError, PlatformErrorKind, PlatformResult};
pub use storage::{StorageError, StorageErrorKind};
