//! Core data types for the rest timer.
//!
//! This module defines the data structures used for:
//! - Timer state and phase tracking
//! - Commands accepted by the timer core
//! - Read-only snapshots for the presentation layer
//! - IPC request/response serialization

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::settings::{RestSettings, SettingsPatch};

// ============================================================================
// TimerState
// ============================================================================

/// Represents the current state of the interval timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Timer is at rest position, nothing is counting
    #[default]
    Idle,
    /// Currently in a working interval
    Working,
    /// Currently in a resting interval (overlay shown)
    Resting,
    /// A working or resting interval has been interrupted
    Paused,
}

impl TimerState {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Working => "working",
            TimerState::Resting => "resting",
            TimerState::Paused => "paused",
        }
    }

    /// Returns true if the state is a countdown phase.
    pub fn is_phase(&self) -> bool {
        matches!(self, TimerState::Working | TimerState::Resting)
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Phase
// ============================================================================

/// One of the two countdown phases.
///
/// Recorded when pausing so that `resume` knows which phase to re-enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Working,
    Resting,
}

impl From<Phase> for TimerState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Working => TimerState::Working,
            Phase::Resting => TimerState::Resting,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&TimerState::from(*self), f)
    }
}

impl TryFrom<TimerState> for Phase {
    type Error = TimerState;

    fn try_from(state: TimerState) -> Result<Self, Self::Error> {
        match state {
            TimerState::Working => Ok(Phase::Working),
            TimerState::Resting => Ok(Phase::Resting),
            other => Err(other),
        }
    }
}

// ============================================================================
// TimerCommand
// ============================================================================

/// Commands the presentation layer can issue to the timer core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerCommand {
    StartWorking,
    StartResting,
    Pause,
    Resume,
    Skip,
    Reset,
}

impl TimerCommand {
    /// Returns the command name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerCommand::StartWorking => "start working",
            TimerCommand::StartResting => "start resting",
            TimerCommand::Pause => "pause",
            TimerCommand::Resume => "resume",
            TimerCommand::Skip => "skip",
            TimerCommand::Reset => "reset",
        }
    }
}

impl fmt::Display for TimerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TimerSnapshot
// ============================================================================

/// Read-only view of the timer, published after every handled command or tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    /// Current state
    pub state: TimerState,
    /// Phase interrupted by a pause (only set while paused)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_from: Option<Phase>,
    /// Seconds remaining in the current phase
    pub seconds_left: u32,
    /// Length of the current phase as entered
    pub total_seconds: u32,
    /// Whether a tick subscription is active
    pub is_running: bool,
    /// Whether the rest overlay should be shown
    pub overlay_visible: bool,
    /// Phase generation, bumped on every phase change
    pub generation: u64,
    /// Remaining time rendered as MM:SS
    pub remaining: String,
    /// Elapsed fraction of the current phase (0.0 - 1.0)
    pub progress: f64,
}

/// Renders a number of seconds as `MM:SS`.
///
/// Minutes are not wrapped into hours, so 100 minutes renders as `100:00`.
pub fn format_mm_ss(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Computes `(total - left) / total`, defined as 0 when `total` is 0.
pub fn progress_fraction(seconds_left: u32, total_seconds: u32) -> f64 {
    if total_seconds == 0 {
        return 0.0;
    }
    let elapsed = total_seconds.saturating_sub(seconds_left);
    f64::from(elapsed) / f64::from(total_seconds)
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Start a working phase
    Start,
    /// Start a resting phase right away
    Rest,
    /// Pause the running phase
    Pause,
    /// Resume the paused phase
    Resume,
    /// Skip the current phase
    Skip {
        /// Phase generation the client rendered; stale skips are rejected
        #[serde(default, skip_serializing_if = "Option::is_none")]
        generation: Option<u64>,
    },
    /// Return to idle
    Reset,
    /// Query the current status
    Status,
    /// Query the current settings
    Settings,
    /// Update settings
    Configure {
        /// Fields to change
        #[serde(flatten)]
        patch: SettingsPatch,
    },
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseData {
    /// Timer snapshot after the request was handled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerSnapshot>,
    /// Settings after the request was handled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<RestSettings>,
}

impl ResponseData {
    /// Creates response data carrying a timer snapshot.
    pub fn from_snapshot(snapshot: TimerSnapshot) -> Self {
        Self {
            timer: Some(snapshot),
            settings: None,
        }
    }

    /// Creates response data carrying settings.
    pub fn from_settings(settings: RestSettings) -> Self {
        Self {
            timer: None,
            settings: Some(settings),
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true if this is an error response.
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }

    /// Returns the timer snapshot carried by this response, if any.
    pub fn snapshot(&self) -> Option<&TimerSnapshot> {
        self.data.as_ref().and_then(|data| data.timer.as_ref())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // TimerState Tests
    // ------------------------------------------------------------------------

    mod timer_state_tests {
        use super::*;

        #[test]
        fn test_default_is_idle() {
            assert_eq!(TimerState::default(), TimerState::Idle);
        }

        #[test]
        fn test_as_str() {
            assert_eq!(TimerState::Idle.as_str(), "idle");
            assert_eq!(TimerState::Working.as_str(), "working");
            assert_eq!(TimerState::Resting.as_str(), "resting");
            assert_eq!(TimerState::Paused.as_str(), "paused");
        }

        #[test]
        fn test_is_phase() {
            assert!(!TimerState::Idle.is_phase());
            assert!(TimerState::Working.is_phase());
            assert!(TimerState::Resting.is_phase());
            assert!(!TimerState::Paused.is_phase());
        }

        #[test]
        fn test_serialize_deserialize() {
            let json = serde_json::to_string(&TimerState::Resting).unwrap();
            assert_eq!(json, "\"resting\"");

            let state: TimerState = serde_json::from_str(&json).unwrap();
            assert_eq!(state, TimerState::Resting);
        }
    }

    // ------------------------------------------------------------------------
    // Phase Tests
    // ------------------------------------------------------------------------

    mod phase_tests {
        use super::*;

        #[test]
        fn test_phase_into_state() {
            assert_eq!(TimerState::from(Phase::Working), TimerState::Working);
            assert_eq!(TimerState::from(Phase::Resting), TimerState::Resting);
        }

        #[test]
        fn test_state_try_into_phase() {
            assert_eq!(Phase::try_from(TimerState::Working), Ok(Phase::Working));
            assert_eq!(Phase::try_from(TimerState::Resting), Ok(Phase::Resting));
            assert_eq!(Phase::try_from(TimerState::Idle), Err(TimerState::Idle));
            assert_eq!(Phase::try_from(TimerState::Paused), Err(TimerState::Paused));
        }
    }

    // ------------------------------------------------------------------------
    // Formatting Tests
    // ------------------------------------------------------------------------

    mod formatting_tests {
        use super::*;

        #[test]
        fn test_format_mm_ss() {
            assert_eq!(format_mm_ss(0), "00:00");
            assert_eq!(format_mm_ss(5), "00:05");
            assert_eq!(format_mm_ss(65), "01:05");
            assert_eq!(format_mm_ss(20 * 60), "20:00");
            assert_eq!(format_mm_ss(100 * 60 + 1), "100:01");
        }

        #[test]
        fn test_progress_fraction_zero_total() {
            assert_eq!(progress_fraction(0, 0), 0.0);
        }

        #[test]
        fn test_progress_fraction() {
            assert_eq!(progress_fraction(10, 10), 0.0);
            assert_eq!(progress_fraction(5, 10), 0.5);
            assert_eq!(progress_fraction(0, 10), 1.0);
        }

        #[test]
        fn test_command_display() {
            assert_eq!(TimerCommand::StartWorking.to_string(), "start working");
            assert_eq!(TimerCommand::Skip.to_string(), "skip");
        }
    }

    // ------------------------------------------------------------------------
    // IPC Types Tests
    // ------------------------------------------------------------------------

    mod ipc_tests {
        use super::*;

        #[test]
        fn test_ipc_request_unit_commands_serialize() {
            let cases = vec![
                (IpcRequest::Start, r#"{"command":"start"}"#),
                (IpcRequest::Rest, r#"{"command":"rest"}"#),
                (IpcRequest::Pause, r#"{"command":"pause"}"#),
                (IpcRequest::Resume, r#"{"command":"resume"}"#),
                (IpcRequest::Reset, r#"{"command":"reset"}"#),
                (IpcRequest::Status, r#"{"command":"status"}"#),
                (IpcRequest::Settings, r#"{"command":"settings"}"#),
            ];

            for (request, expected) in cases {
                assert_eq!(serde_json::to_string(&request).unwrap(), expected);
            }
        }

        #[test]
        fn test_ipc_request_skip_without_generation() {
            let json = serde_json::to_string(&IpcRequest::Skip { generation: None }).unwrap();
            assert_eq!(json, r#"{"command":"skip"}"#);

            let request: IpcRequest = serde_json::from_str(r#"{"command":"skip"}"#).unwrap();
            assert!(matches!(request, IpcRequest::Skip { generation: None }));
        }

        #[test]
        fn test_ipc_request_skip_with_generation() {
            let request: IpcRequest =
                serde_json::from_str(r#"{"command":"skip","generation":7}"#).unwrap();
            assert!(matches!(request, IpcRequest::Skip { generation: Some(7) }));
        }

        #[test]
        fn test_ipc_request_configure_deserialize() {
            let json = r#"{"command":"configure","work_seconds":1500,"cycle_enabled":true}"#;
            let request: IpcRequest = serde_json::from_str(json).unwrap();

            match request {
                IpcRequest::Configure { patch } => {
                    assert_eq!(patch.work_seconds, Some(1500));
                    assert_eq!(patch.cycle_enabled, Some(true));
                    assert!(patch.rest_seconds.is_none());
                }
                _ => panic!("Expected Configure request"),
            }
        }

        #[test]
        fn test_ipc_response_success() {
            let snapshot = TimerSnapshot {
                state: TimerState::Working,
                seconds_left: 1200,
                total_seconds: 1200,
                is_running: true,
                remaining: "20:00".to_string(),
                ..TimerSnapshot::default()
            };
            let response =
                IpcResponse::success("Working", Some(ResponseData::from_snapshot(snapshot)));

            assert_eq!(response.status, "success");
            assert!(!response.is_error());
            assert_eq!(response.snapshot().unwrap().seconds_left, 1200);
        }

        #[test]
        fn test_ipc_response_error() {
            let response = IpcResponse::error("cannot pause while idle");

            assert!(response.is_error());
            assert_eq!(response.message, "cannot pause while idle");
            assert!(response.data.is_none());
            assert!(response.snapshot().is_none());
        }

        #[test]
        fn test_snapshot_serializes_camel_case() {
            let snapshot = TimerSnapshot {
                state: TimerState::Paused,
                paused_from: Some(Phase::Resting),
                seconds_left: 12,
                total_seconds: 20,
                ..TimerSnapshot::default()
            };

            let json = serde_json::to_string(&snapshot).unwrap();
            assert!(json.contains("\"state\":\"paused\""));
            assert!(json.contains("\"pausedFrom\":\"resting\""));
            assert!(json.contains("\"secondsLeft\":12"));
            assert!(json.contains("\"overlayVisible\":false"));
        }

        #[test]
        fn test_ipc_response_deserialize() {
            let json = r#"{"status":"success","message":"OK","data":{"timer":{"state":"resting","secondsLeft":20,"totalSeconds":20,"isRunning":true,"overlayVisible":true,"generation":3,"remaining":"00:20","progress":0.0}}}"#;
            let response: IpcResponse = serde_json::from_str(json).unwrap();

            let snapshot = response.snapshot().unwrap();
            assert_eq!(snapshot.state, TimerState::Resting);
            assert!(snapshot.overlay_visible);
            assert_eq!(snapshot.paused_from, None);
            assert_eq!(snapshot.generation, 3);
        }
    }
}
