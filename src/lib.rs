//! breather library
//!
//! This library provides the core functionality for the breather CLI.
//! It includes:
//! - Interval timer core alternating working and resting phases
//! - Timer engine and effect dispatch for the background daemon
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities
//! - Persisted settings and external hook commands

pub mod cli;
pub mod daemon;
pub mod hooks;
pub mod settings;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    IpcRequest, IpcResponse, Phase, ResponseData, TimerCommand, TimerSnapshot, TimerState,
};

pub use settings::{RestSettings, SettingsError, SettingsPatch, SettingsProvider, SettingsStore};

pub use hooks::{run_hook, HookConfig, HookError};

pub use daemon::{
    Effect, EffectSink, IntervalTimer, NotificationKind, TimerEngine, TimerError, TimerHandle,
};
