//! Hook error types.

use thiserror::Error;

/// Errors that can occur while running the effect hook.
///
/// None of these stop the timer; the dispatcher logs them and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The hook is disabled or has no program.
    #[error("no hook configured")]
    NotConfigured,

    /// The program could not be started.
    #[error("failed to start hook '{0}': {1}")]
    SpawnFailed(String, String),

    /// The program exited unsuccessfully.
    #[error("hook '{0}' failed: {1}")]
    ExecutionFailed(String, String),

    /// The program did not finish in time and was killed.
    #[error("hook '{0}' timed out after {1}s")]
    ExecutionTimeout(String, u64),
}

impl HookError {
    /// Returns true if this error is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ExecutionTimeout(_, _))
    }
}
