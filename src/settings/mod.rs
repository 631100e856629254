//! Settings for the rest timer.
//!
//! The timer core never owns its configuration. It reads durations and
//! toggles through the [`SettingsProvider`] trait at the start of every
//! phase, so edits made while a phase is running apply from the next phase.
//!
//! - [`RestSettings`]: the persisted configuration (JSON)
//! - [`SettingsPatch`]: a partial update received over IPC or the CLI
//! - [`SettingsStore`]: thread-safe, optionally file-backed provider

mod error;
mod store;

use serde::{Deserialize, Serialize};

use crate::hooks::HookConfig;

pub use error::SettingsError;
pub use store::{default_settings_path, SettingsStore, APP_DIR};

/// Accepted range for the working phase, in seconds (up to 4 hours).
pub const WORK_SECONDS_RANGE: (u32, u32) = (1, 4 * 60 * 60);

/// Accepted range for the resting phase, in seconds (up to 1 hour).
pub const REST_SECONDS_RANGE: (u32, u32) = (1, 60 * 60);

/// Accepted range for the pre-rest notice offset, in seconds.
pub const NOTICE_SECONDS_RANGE: (u32, u32) = (1, 60 * 60);

fn default_work_seconds() -> u32 {
    20 * 60
}

fn default_rest_seconds() -> u32 {
    20
}

fn default_notice_seconds() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

fn default_rest_prompt() -> String {
    "Look into the distance".to_string()
}

fn default_rest_end_prompt() -> String {
    "Rest is over, time to get back to work".to_string()
}

// ============================================================================
// SettingsProvider
// ============================================================================

/// Source of durations and toggles for the timer core.
///
/// Implementations must always return positive durations.
pub trait SettingsProvider: Send + Sync {
    /// Length of a working phase in seconds.
    fn work_duration(&self) -> u32;

    /// Length of a resting phase in seconds.
    fn rest_duration(&self) -> u32;

    /// Whether a new working phase starts automatically after rest.
    fn cycle_enabled(&self) -> bool;

    /// Remaining seconds of the working phase at which the pre-rest
    /// notice is sent. `0` disables the notice.
    fn pre_rest_notice_offset(&self) -> u32;

    /// Whether notifications are sent at all.
    fn notifications_enabled(&self) -> bool;

    /// Whether the resting phase may be skipped.
    fn skip_allowed(&self) -> bool {
        true
    }

    /// Message of the rest-starting notification.
    fn rest_prompt(&self) -> String {
        default_rest_prompt()
    }

    /// Message of the rest-ending notification.
    fn rest_end_prompt(&self) -> String {
        default_rest_end_prompt()
    }
}

// ============================================================================
// RestSettings
// ============================================================================

/// Persisted configuration of the rest timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestSettings {
    /// Working phase length in seconds
    #[serde(default = "default_work_seconds")]
    pub work_seconds: u32,
    /// Resting phase length in seconds
    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,
    /// Start a new working phase after each rest
    #[serde(default)]
    pub cycle_enabled: bool,
    /// Send a notice shortly before the rest starts
    #[serde(default = "default_true")]
    pub notify_before_rest: bool,
    /// How many seconds before the rest the notice is sent
    #[serde(default = "default_notice_seconds")]
    pub notice_seconds: u32,
    /// Master switch for notifications
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    /// Strict mode when false: the rest cannot be skipped
    #[serde(default = "default_true")]
    pub skip_allowed: bool,
    /// Rest-starting notification text
    #[serde(default = "default_rest_prompt")]
    pub rest_prompt: String,
    /// Rest-ending notification text
    #[serde(default = "default_rest_end_prompt")]
    pub rest_end_prompt: String,
    /// External command run for every effect
    #[serde(default)]
    pub hook: HookConfig,
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            work_seconds: default_work_seconds(),
            rest_seconds: default_rest_seconds(),
            cycle_enabled: false,
            notify_before_rest: true,
            notice_seconds: default_notice_seconds(),
            notifications_enabled: true,
            skip_allowed: true,
            rest_prompt: default_rest_prompt(),
            rest_end_prompt: default_rest_end_prompt(),
            hook: HookConfig::default(),
        }
    }
}

impl RestSettings {
    /// Sets the working phase length.
    #[must_use]
    pub fn with_work_seconds(mut self, seconds: u32) -> Self {
        self.work_seconds = seconds;
        self
    }

    /// Sets the resting phase length.
    #[must_use]
    pub fn with_rest_seconds(mut self, seconds: u32) -> Self {
        self.rest_seconds = seconds;
        self
    }

    /// Enables or disables cycling.
    #[must_use]
    pub fn with_cycle(mut self, enabled: bool) -> Self {
        self.cycle_enabled = enabled;
        self
    }

    /// Validates every numeric field against its range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range("work_seconds", self.work_seconds, WORK_SECONDS_RANGE)?;
        check_range("rest_seconds", self.rest_seconds, REST_SECONDS_RANGE)?;
        check_range("notice_seconds", self.notice_seconds, NOTICE_SECONDS_RANGE)?;
        Ok(())
    }

    /// Applies a patch on a copy of these settings.
    ///
    /// A zero duration keeps the previous value. Any other out-of-range
    /// value rejects the whole patch.
    pub fn patched(&self, patch: &SettingsPatch) -> Result<Self, SettingsError> {
        let mut next = self.clone();

        if let Some(work) = patch.work_seconds {
            next.work_seconds = keep_previous_if_zero("work_seconds", work, self.work_seconds);
        }
        if let Some(rest) = patch.rest_seconds {
            next.rest_seconds = keep_previous_if_zero("rest_seconds", rest, self.rest_seconds);
        }
        if let Some(notice) = patch.notice_seconds {
            next.notice_seconds =
                keep_previous_if_zero("notice_seconds", notice, self.notice_seconds);
        }
        if let Some(cycle) = patch.cycle_enabled {
            next.cycle_enabled = cycle;
        }
        if let Some(notify) = patch.notify_before_rest {
            next.notify_before_rest = notify;
        }
        if let Some(enabled) = patch.notifications_enabled {
            next.notifications_enabled = enabled;
        }
        if let Some(skip) = patch.skip_allowed {
            next.skip_allowed = skip;
        }
        if let Some(prompt) = &patch.rest_prompt {
            next.rest_prompt = prompt.clone();
        }
        if let Some(prompt) = &patch.rest_end_prompt {
            next.rest_end_prompt = prompt.clone();
        }

        next.validate()?;
        Ok(next)
    }
}

impl SettingsProvider for RestSettings {
    fn work_duration(&self) -> u32 {
        self.work_seconds
    }

    fn rest_duration(&self) -> u32 {
        self.rest_seconds
    }

    fn cycle_enabled(&self) -> bool {
        self.cycle_enabled
    }

    fn pre_rest_notice_offset(&self) -> u32 {
        if self.notify_before_rest {
            self.notice_seconds
        } else {
            0
        }
    }

    fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    fn skip_allowed(&self) -> bool {
        self.skip_allowed
    }

    fn rest_prompt(&self) -> String {
        self.rest_prompt.clone()
    }

    fn rest_end_prompt(&self) -> String {
        self.rest_end_prompt.clone()
    }
}

fn check_range(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), SettingsError> {
    if value < min || value > max {
        return Err(SettingsError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn keep_previous_if_zero(field: &str, value: u32, previous: u32) -> u32 {
    if value == 0 {
        tracing::warn!("{} cannot be zero, keeping {}", field, previous);
        previous
    } else {
        value
    }
}

// ============================================================================
// SettingsPatch
// ============================================================================

/// Partial settings update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_before_rest: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_end_prompt: Option<String>,
}

impl SettingsPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod rest_settings_tests {
        use super::*;

        #[test]
        fn test_default_values() {
            let settings = RestSettings::default();
            assert_eq!(settings.work_seconds, 1200);
            assert_eq!(settings.rest_seconds, 20);
            assert!(!settings.cycle_enabled);
            assert!(settings.notify_before_rest);
            assert_eq!(settings.notice_seconds, 20);
            assert!(settings.notifications_enabled);
            assert!(settings.skip_allowed);
            assert!(!settings.hook.enabled);
            assert!(settings.validate().is_ok());
        }

        #[test]
        fn test_builder_pattern() {
            let settings = RestSettings::default()
                .with_work_seconds(5)
                .with_rest_seconds(3)
                .with_cycle(true);

            assert_eq!(settings.work_duration(), 5);
            assert_eq!(settings.rest_duration(), 3);
            assert!(settings.cycle_enabled());
        }

        #[test]
        fn test_validate_boundaries() {
            assert!(RestSettings::default().with_work_seconds(1).validate().is_ok());
            assert!(RestSettings::default()
                .with_work_seconds(4 * 60 * 60)
                .validate()
                .is_ok());
            assert!(RestSettings::default()
                .with_work_seconds(4 * 60 * 60 + 1)
                .validate()
                .is_err());
            assert!(RestSettings::default().with_rest_seconds(0).validate().is_err());
            assert!(RestSettings::default()
                .with_rest_seconds(60 * 60 + 1)
                .validate()
                .is_err());
        }

        #[test]
        fn test_notice_offset_disabled() {
            let settings = RestSettings {
                notify_before_rest: false,
                ..RestSettings::default()
            };
            assert_eq!(settings.pre_rest_notice_offset(), 0);
        }

        #[test]
        fn test_deserialize_fills_defaults() {
            let settings: RestSettings = serde_json::from_str(r#"{"rest_seconds":30}"#).unwrap();
            assert_eq!(settings.rest_seconds, 30);
            assert_eq!(settings.work_seconds, 1200);
            assert!(settings.skip_allowed);
            assert_eq!(settings.rest_prompt, "Look into the distance");
        }
    }

    mod patch_tests {
        use super::*;

        #[test]
        fn test_patch_applies_fields() {
            let patch = SettingsPatch {
                work_seconds: Some(1500),
                cycle_enabled: Some(true),
                rest_prompt: Some("Stretch".to_string()),
                ..SettingsPatch::default()
            };

            let next = RestSettings::default().patched(&patch).unwrap();
            assert_eq!(next.work_seconds, 1500);
            assert!(next.cycle_enabled);
            assert_eq!(next.rest_prompt, "Stretch");
            assert_eq!(next.rest_seconds, 20);
        }

        #[test]
        fn test_patch_zero_duration_keeps_previous() {
            let current = RestSettings::default().with_rest_seconds(45);
            let patch = SettingsPatch {
                rest_seconds: Some(0),
                work_seconds: Some(0),
                ..SettingsPatch::default()
            };

            let next = current.patched(&patch).unwrap();
            assert_eq!(next.rest_seconds, 45);
            assert_eq!(next.work_seconds, 1200);
        }

        #[test]
        fn test_patch_out_of_range_rejected() {
            let patch = SettingsPatch {
                rest_seconds: Some(10_000),
                ..SettingsPatch::default()
            };

            let err = RestSettings::default().patched(&patch).unwrap_err();
            assert!(matches!(
                err,
                SettingsError::OutOfRange {
                    field: "rest_seconds",
                    ..
                }
            ));
        }

        #[test]
        fn test_empty_patch() {
            assert!(SettingsPatch::default().is_empty());
            let patch = SettingsPatch {
                skip_allowed: Some(false),
                ..SettingsPatch::default()
            };
            assert!(!patch.is_empty());
        }
    }
}
