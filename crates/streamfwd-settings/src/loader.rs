//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ForwarderSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{ForwarderSettings, MAX_KEEPALIVE_INTERVAL_SECS, MIN_KEEPALIVE_INTERVAL_SECS};

/// Env var naming an explicit settings file.
pub const SETTINGS_PATH_ENV: &str = "STREAMFWD_SETTINGS";
/// Any non-empty value disables SSE keepalive injection.
pub const DISABLE_KEEPALIVE_ENV: &str = "DISABLE_SSE_KEEPALIVE";
/// Keepalive interval override in seconds (`1..=3600`).
pub const KEEPALIVE_INTERVAL_ENV: &str = "STREAMFWD_KEEPALIVE_INTERVAL_SECS";
/// Default log level override.
pub const LOG_LEVEL_ENV: &str = "STREAMFWD_LOG_LEVEL";
/// Boolean switch for JSON log lines.
pub const LOG_JSON_ENV: &str = "STREAMFWD_LOG_JSON";

/// Resolve the settings file path.
///
/// `$STREAMFWD_SETTINGS` if set, otherwise `~/.streamfwd/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(explicit) = read_env_string(SETTINGS_PATH_ENV) {
        return PathBuf::from(explicit);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".streamfwd").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ForwarderSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON or an invalid merged value is
/// an error.
pub fn load_settings_from_path(path: &Path) -> Result<ForwarderSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<ForwarderSettings> {
    let defaults = serde_json::to_value(ForwarderSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut ForwarderSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// - `DISABLE_SSE_KEEPALIVE`: any non-empty value disables keepalive
/// - `STREAMFWD_KEEPALIVE_INTERVAL_SECS`: integer in `1..=3600`
/// - `STREAMFWD_LOG_LEVEL`: non-empty string
/// - `STREAMFWD_LOG_JSON`: boolean (see [`parse_bool`])
///
/// Invalid values are ignored with a warning.
pub fn apply_overrides<F>(settings: &mut ForwarderSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if lookup(DISABLE_KEEPALIVE_ENV).is_some_and(|v| !v.is_empty()) {
        settings.keepalive.enabled = false;
    }
    if let Some(raw) = lookup(KEEPALIVE_INTERVAL_ENV) {
        match parse_u64_range(&raw, MIN_KEEPALIVE_INTERVAL_SECS, MAX_KEEPALIVE_INTERVAL_SECS) {
            Some(v) => settings.keepalive.interval_secs = v,
            None => {
                warn!(key = KEEPALIVE_INTERVAL_ENV, value = %raw, "invalid u64 env var, ignoring");
            }
        }
    }
    if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.is_empty()) {
        settings.logging.level = level;
    }
    if let Some(raw) = lookup(LOG_JSON_ENV) {
        match parse_bool(&raw) {
            Some(v) => settings.logging.json = v,
            None => warn!(key = LOG_JSON_ENV, value = %raw, "invalid boolean env var, ignoring"),
        }
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
