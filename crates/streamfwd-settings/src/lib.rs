//! # streamfwd-settings
//!
//! Layered configuration for the stream forwarder.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ForwarderSettings::default()`]
//! 2. **Settings file**: `$STREAMFWD_SETTINGS` or `~/.streamfwd/settings.json`
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `DISABLE_SSE_KEEPALIVE`, `STREAMFWD_*`
//!    overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_overrides, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
