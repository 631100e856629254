//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, validating or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read or written.
    #[error("settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for `RestSettings`.
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value is outside its accepted range.
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// The home directory could not be determined.
    #[error("could not determine the home directory")]
    NoHomeDirectory,
}

impl SettingsError {
    /// Returns true if the error came from user input rather than the filesystem.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }
}
