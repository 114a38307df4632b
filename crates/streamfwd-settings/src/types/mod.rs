//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. Types marked `#[serde(default)]`
//! accept partial JSON: missing fields get their default.

mod keepalive;
mod logging;

pub use keepalive::*;
pub use logging::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings for the stream forwarder.
///
/// ```json
/// {
///   "keepalive": { "enabled": true, "intervalSecs": 15 },
///   "logging": { "level": "info" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwarderSettings {
    /// SSE keepalive injection.
    pub keepalive: KeepaliveSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl ForwarderSettings {
    /// Reject values the forwarder cannot run with.
    pub fn validate(&self) -> Result<()> {
        let secs = self.keepalive.interval_secs;
        if !(MIN_KEEPALIVE_INTERVAL_SECS..=MAX_KEEPALIVE_INTERVAL_SECS).contains(&secs) {
            return Err(SettingsError::InvalidValue(format!(
                "keepalive.intervalSecs must be in {MIN_KEEPALIVE_INTERVAL_SECS}..={MAX_KEEPALIVE_INTERVAL_SECS}, got {secs}"
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_are_valid() {
        assert!(ForwarderSettings::default().validate().is_ok());
    }

    #[test]
    fn zero_interval_rejected() {
        let mut settings = ForwarderSettings::default();
        settings.keepalive.interval_secs = 0;
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn interval_above_one_hour_rejected() {
        let mut settings = ForwarderSettings::default();
        settings.keepalive.interval_secs = MAX_KEEPALIVE_INTERVAL_SECS;
        assert!(settings.validate().is_ok());
        settings.keepalive.interval_secs = MAX_KEEPALIVE_INTERVAL_SECS + 1;
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(_)));
        settings.keepalive.interval_secs = u64::MAX;
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(msg)) if msg.contains("intervalSecs"));
    }

    #[test]
    fn empty_level_rejected() {
        let mut settings = ForwarderSettings::default();
        settings.logging.level = " ".to_string();
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn camel_case_wire_format() {
        let json = serde_json::to_value(ForwarderSettings::default()).unwrap();
        assert_eq!(json["keepalive"]["intervalSecs"], 15);
        assert_eq!(json["keepalive"]["enabled"], true);
        assert_eq!(json["logging"]["level"], "info");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: ForwarderSettings =
            serde_json::from_str(r#"{"keepalive": {"enabled": false}}"#).unwrap();
        assert!(!settings.keepalive.enabled);
        assert_eq!(settings.keepalive.interval_secs, 15);
        assert_eq!(settings.logging.level, "info");
    }
}
