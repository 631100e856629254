//! Display utilities for the breather CLI.
//!
//! This module provides formatted output for:
//! - Command results
//! - Status display (one-shot and watch mode)
//! - Settings display
//! - Error messages

use std::io::Write;

use crate::settings::RestSettings;
use crate::types::{IpcResponse, TimerSnapshot, TimerState};

/// Width of the progress bar in characters.
const BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the result of a timer command.
    pub fn show_command_result(response: &IpcResponse) {
        println!("* {}", response.message);
        if let Some(snapshot) = response.snapshot() {
            println!("  {}", Self::status_line(snapshot));
        }
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        match response.snapshot() {
            Some(snapshot) => {
                println!("breather status");
                println!("─────────────────────────────");
                println!("{}", Self::status_line(snapshot));
                if snapshot.overlay_visible {
                    println!("Rest overlay is showing");
                }
            }
            None => println!("The timer is not running"),
        }
    }

    /// Rewrites the status on the current terminal line (watch mode).
    pub fn show_status_inline(snapshot: &TimerSnapshot) {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "\r\x1b[2K{}", Self::status_line(snapshot));
        let _ = stdout.flush();
    }

    /// Shows the daemon's settings.
    pub fn show_settings(response: &IpcResponse) {
        let Some(settings) = response.data.as_ref().and_then(|data| data.settings.as_ref()) else {
            println!("No settings received");
            return;
        };
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }
        for line in Self::settings_lines(settings) {
            println!("{}", line);
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Renders `state  MM:SS  [bar]  NN%  #generation`.
    ///
    /// The generation is what `breather skip --generation` expects.
    pub fn status_line(snapshot: &TimerSnapshot) -> String {
        let state = match (snapshot.state, snapshot.paused_from) {
            (TimerState::Paused, Some(phase)) => format!("paused ({})", phase),
            (state, _) => state.to_string(),
        };
        if snapshot.state == TimerState::Idle {
            return state;
        }

        let mut line = format!(
            "{:<17} {}  {}  {:>3}%  #{}",
            state,
            snapshot.remaining,
            Self::progress_bar(snapshot.progress, BAR_WIDTH),
            (snapshot.progress * 100.0).round() as u32,
            snapshot.generation
        );
        if snapshot.state.is_phase() && !snapshot.is_running {
            line.push_str("  (clock stopped)");
        }
        line
    }

    /// Renders a fraction in `[0, 1]` as `[####------]`.
    pub fn progress_bar(fraction: f64, width: usize) -> String {
        let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
        format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
    }

    fn settings_lines(settings: &RestSettings) -> Vec<String> {
        let on_off = |value: bool| if value { "on" } else { "off" };
        let mut lines = vec![
            format!("Work:            {}", Self::duration(settings.work_seconds)),
            format!("Rest:            {}", Self::duration(settings.rest_seconds)),
            format!("Cycle:           {}", on_off(settings.cycle_enabled)),
            format!(
                "Pre-rest notice: {} ({}s before)",
                on_off(settings.notify_before_rest),
                settings.notice_seconds
            ),
            format!("Notifications:   {}", on_off(settings.notifications_enabled)),
            format!("Skip allowed:    {}", on_off(settings.skip_allowed)),
            format!("Rest prompt:     {}", settings.rest_prompt),
            format!("Rest end prompt: {}", settings.rest_end_prompt),
        ];
        if settings.hook.is_enabled() {
            lines.push(format!(
                "Hook:            {} {}",
                settings.hook.program,
                settings.hook.args.join(" ")
            ));
        } else {
            lines.push("Hook:            off".to_string());
        }
        lines
    }

    fn duration(seconds: u32) -> String {
        match (seconds / 60, seconds % 60) {
            (0, s) => format!("{}s", s),
            (m, 0) => format!("{}m", m),
            (m, s) => format!("{}m {}s", m, s),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
