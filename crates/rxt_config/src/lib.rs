//! Guild security configuration and process settings.
//!
//! - [`SecurityConfig`]: typed per-guild feature toggles, thresholds,
//!   whitelists and cached quarantine resource IDs
//! - [`ConfigStore`]: the engine's read/write interface to guild configuration,
//!   with volatile and JSON-file implementations
//! - [`RxtConfig`]: process settings loaded from layered TOML sources

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod json_file;
mod security;
mod settings;
mod store;

pub use json_file::{read_json, write_json};
pub use security::{DetectorToggles, SecurityConfig, Threshold};
pub use settings::{QuarantineNaming, RxtConfig};
pub use store::{ConfigMutation, ConfigStore, JsonConfigStore, MemoryConfigStore};
