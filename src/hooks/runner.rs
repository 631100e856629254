//! Hook execution.
//!
//! The configured program is started once per effect with the effect
//! described in environment variables:
//!
//! - `BREATHER_EFFECT`: effect name, e.g. `show_overlay`
//! - `BREATHER_NOTIFICATION`: notification kind (notifications only)
//! - `BREATHER_MESSAGE`: notification message (notifications only)

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::config::HookConfig;
use super::error::HookError;
use crate::daemon::effects::Effect;

pub const ENV_EFFECT: &str = "BREATHER_EFFECT";
pub const ENV_NOTIFICATION: &str = "BREATHER_NOTIFICATION";
pub const ENV_MESSAGE: &str = "BREATHER_MESSAGE";

/// Runs the hook for one effect and waits for it to exit.
///
/// # Errors
///
/// Returns [`HookError::NotConfigured`] when the hook is disabled, and the
/// matching error when the program cannot start, fails, or times out.
pub async fn run_hook(config: &HookConfig, effect: &Effect) -> Result<(), HookError> {
    if !config.is_enabled() {
        return Err(HookError::NotConfigured);
    }

    let mut command = Command::new(&config.program);
    command
        .args(&config.args)
        .env(ENV_EFFECT, effect.name())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Effect::SendNotification { kind, message } = effect {
        command
            .env(ENV_NOTIFICATION, kind.as_str())
            .env(ENV_MESSAGE, message);
    }

    debug!("Running hook {} for {}", config.program, effect.name());

    let child = command
        .spawn()
        .map_err(|e| HookError::SpawnFailed(config.program.clone(), e.to_string()))?;

    let output = match timeout(
        Duration::from_secs(config.timeout_seconds),
        child.wait_with_output(),
    )
    .await
    {
        Ok(result) => {
            result.map_err(|e| HookError::ExecutionFailed(config.program.clone(), e.to_string()))?
        }
        Err(_) => {
            warn!(
                "Hook {} timed out after {}s",
                config.program, config.timeout_seconds
            );
            return Err(HookError::ExecutionTimeout(
                config.program.clone(),
                config.timeout_seconds,
            ));
        }
    };

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            output.status.to_string()
        } else {
            stderr.trim().to_string()
        };
        Err(HookError::ExecutionFailed(config.program.clone(), detail))
    }
}
