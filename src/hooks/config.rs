//! Hook configuration types.

use serde::{Deserialize, Serialize};

/// Default timeout for a hook run in seconds.
fn default_timeout_seconds() -> u64 {
    5
}

/// External command run once per delivered effect.
///
/// The default configuration is disabled and has no program.
///
/// # Example
///
/// ```
/// use breather::hooks::HookConfig;
///
/// let config = HookConfig::command("notify-send", ["breather"]);
/// assert!(config.is_enabled());
/// assert_eq!(config.timeout_seconds, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookConfig {
    /// Whether the hook runs at all.
    #[serde(default)]
    pub enabled: bool,

    /// Program to execute. Looked up in `PATH` when not absolute.
    #[serde(default)]
    pub program: String,

    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,

    /// Maximum run time in seconds before the hook is killed.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: String::new(),
            args: Vec::new(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl HookConfig {
    /// Creates an enabled hook running `program` with `args`.
    #[must_use]
    pub fn command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Returns true if the hook is enabled and names a program.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.program.trim().is_empty()
    }

    /// Sets the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}
