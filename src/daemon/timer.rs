//! Interval timer core.
//!
//! This module owns the work/rest state machine:
//! - State transitions (Idle → Working → Resting → Working/Idle, Paused)
//! - Countdown driven by one-second ticks from a [`ClockSource`]
//! - Effect requests (sound, notification, overlay, window) sent to an [`EffectSink`]
//! - Re-entrancy guard and phase generation for stale-request detection
//!
//! Every entry point runs to completion. The core is not shared between
//! threads; see [`crate::daemon::engine`] for the task that serializes
//! commands and ticks onto it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::clock::ClockSource;
use super::effects::{Effect, EffectSink, NotificationKind};
use crate::settings::SettingsProvider;
use crate::types::{format_mm_ss, progress_fraction, Phase, TimerCommand, TimerSnapshot, TimerState};

/// Message of the pre-rest notice.
const REST_UPCOMING_MESSAGE: &str = "Rest is about to start";

// ============================================================================
// TimerError
// ============================================================================

/// Rejected commands. The timer state is untouched when one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The command is not valid from the current state.
    #[error("cannot {command} while {state}")]
    InvalidTransition {
        command: TimerCommand,
        state: TimerState,
    },

    /// A boundary transition is still being applied.
    #[error("cannot {command} during a phase transition")]
    ReentrantTransition { command: TimerCommand },

    /// Strict mode: the resting phase cannot be skipped.
    #[error("skipping the rest is disabled")]
    SkipDisallowed,

    /// The request targeted a phase that has already ended.
    #[error("cannot {command}: phase {expected} is over (now {current})")]
    StalePhase {
        command: TimerCommand,
        expected: u64,
        current: u64,
    },
}

// ============================================================================
// IntervalTimer
// ============================================================================

/// Settings captured when a phase is entered.
#[derive(Debug, Clone, Default)]
struct PhaseSettings {
    cycle_enabled: bool,
    notice_offset: u32,
    notifications_enabled: bool,
    skip_allowed: bool,
    rest_prompt: String,
    rest_end_prompt: String,
}

/// Why a phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cause {
    Expired,
    Skipped,
}

/// The work/rest interval timer.
pub struct IntervalTimer {
    state: TimerState,
    paused_from: Option<Phase>,
    seconds_left: u32,
    total_seconds: u32,
    is_running: bool,
    overlay_visible: bool,
    transition_in_flight: bool,
    window_raised: bool,
    generation: u64,
    phase: PhaseSettings,
    settings: Arc<dyn SettingsProvider>,
    clock: Box<dyn ClockSource>,
    effects: Box<dyn EffectSink>,
}

impl IntervalTimer {
    /// Creates an idle timer.
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        clock: Box<dyn ClockSource>,
        effects: Box<dyn EffectSink>,
    ) -> Self {
        Self {
            state: TimerState::Idle,
            paused_from: None,
            seconds_left: 0,
            total_seconds: 0,
            is_running: false,
            overlay_visible: false,
            transition_in_flight: false,
            window_raised: false,
            generation: 0,
            phase: PhaseSettings::default(),
            settings,
            clock,
            effects,
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Starts a working phase. Valid from `Idle` only.
    pub fn start_working(&mut self) -> Result<(), TimerError> {
        self.guard(TimerCommand::StartWorking)?;
        if self.state != TimerState::Idle {
            return Err(self.invalid(TimerCommand::StartWorking));
        }

        self.enter_working();
        Ok(())
    }

    /// Starts a resting phase from `Idle`, or ends the working phase early.
    pub fn start_resting(&mut self) -> Result<(), TimerError> {
        self.guard(TimerCommand::StartResting)?;
        match self.state {
            TimerState::Idle => self.enter_resting(),
            TimerState::Working => self.finish_phase(Cause::Skipped),
            _ => return Err(self.invalid(TimerCommand::StartResting)),
        }
        Ok(())
    }

    /// Pauses the running phase, keeping its countdown.
    pub fn pause(&mut self) -> Result<(), TimerError> {
        self.guard(TimerCommand::Pause)?;
        let Ok(phase) = Phase::try_from(self.state) else {
            return Err(self.invalid(TimerCommand::Pause));
        };

        self.stop_ticking();
        self.clock.cancel_restore();
        self.paused_from = Some(phase);
        self.state = TimerState::Paused;
        self.generation += 1;
        self.hide_overlay();
        info!("Paused {} phase at {}", phase, self.remaining_formatted());
        Ok(())
    }

    /// Resumes the paused phase where it stopped.
    ///
    /// Nothing of the phase entry is replayed; a resumed rest only shows
    /// its overlay again.
    pub fn resume(&mut self) -> Result<(), TimerError> {
        self.guard(TimerCommand::Resume)?;
        let Some(phase) = self.paused_from.filter(|_| self.state == TimerState::Paused) else {
            return Err(self.invalid(TimerCommand::Resume));
        };

        self.state = phase.into();
        self.paused_from = None;
        self.generation += 1;
        if phase == Phase::Resting {
            self.overlay_visible = true;
            self.emit(Effect::ShowOverlay);
        }
        self.start_ticking();
        info!("Resumed {} phase at {}", phase, self.remaining_formatted());
        Ok(())
    }

    /// Ends the current phase immediately, as if its countdown had run out.
    pub fn skip(&mut self) -> Result<(), TimerError> {
        self.guard(TimerCommand::Skip)?;
        match self.state {
            TimerState::Working => {}
            TimerState::Resting if !self.phase.skip_allowed => {
                warn!("Skip rejected: strict mode is on");
                return Err(TimerError::SkipDisallowed);
            }
            TimerState::Resting => {}
            _ => return Err(self.invalid(TimerCommand::Skip)),
        }

        info!("Skipping {} phase", self.state);
        self.finish_phase(Cause::Skipped);
        Ok(())
    }

    /// Skips only if `generation` is still the current phase.
    ///
    /// Two identical requests issued against the same rendered phase result
    /// in one transition; the second is rejected as stale.
    pub fn skip_phase(&mut self, generation: u64) -> Result<(), TimerError> {
        if generation != self.generation {
            debug!(
                "Stale skip for phase {} (current {})",
                generation, self.generation
            );
            return Err(TimerError::StalePhase {
                command: TimerCommand::Skip,
                expected: generation,
                current: self.generation,
            });
        }
        self.skip()
    }

    /// Returns to `Idle` from any state. Always succeeds.
    pub fn reset(&mut self) {
        self.stop_ticking();
        self.clock.cancel_restore();
        self.transition_in_flight = false;
        self.hide_overlay();
        if self.state != TimerState::Idle {
            info!("Timer reset from {}", self.state);
            self.enter_idle();
        }
        self.window_raised = false;
        self.emit(Effect::RestoreWindow);
    }

    /// Handles one clock tick. Returns true if the tick ended the phase.
    pub fn tick(&mut self) -> bool {
        if !self.is_running {
            return false;
        }
        if self.transition_in_flight {
            debug!("Tick ignored: transition in flight");
            return false;
        }

        if self.seconds_left > 1 {
            self.seconds_left -= 1;
            if self.state == TimerState::Working
                && self.phase.notice_offset != 0
                && self.seconds_left == self.phase.notice_offset
            {
                self.notify(NotificationKind::RestUpcoming, REST_UPCOMING_MESSAGE.to_string());
            }
            return false;
        }

        self.finish_phase(Cause::Expired);
        true
    }

    /// Handles the deferred restore scheduled when phase `generation` began
    /// resting. Returns true if the window was restored.
    pub fn restore_due(&mut self, generation: u64) -> bool {
        if generation != self.generation
            || self.state != TimerState::Resting
            || !self.window_raised
        {
            debug!("Deferred restore for phase {} is stale", generation);
            return false;
        }

        self.window_raised = false;
        self.emit(Effect::RestoreWindow);
        true
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn paused_from(&self) -> Option<Phase> {
        self.paused_from
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Counter identifying the current phase instance.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Remaining time as `MM:SS`.
    pub fn remaining_formatted(&self) -> String {
        format_mm_ss(self.seconds_left)
    }

    /// Elapsed share of the current phase, `0.0` when idle.
    pub fn progress_fraction(&self) -> f64 {
        progress_fraction(self.seconds_left, self.total_seconds)
    }

    /// Returns the observable state.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            paused_from: self.paused_from,
            seconds_left: self.seconds_left,
            total_seconds: self.total_seconds,
            is_running: self.is_running,
            overlay_visible: self.overlay_visible,
            generation: self.generation,
            remaining: self.remaining_formatted(),
            progress: self.progress_fraction(),
        }
    }

    /// Forces the in-flight flag (for testing).
    #[cfg(test)]
    pub(crate) fn set_transition_in_flight(&mut self, in_flight: bool) {
        self.transition_in_flight = in_flight;
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Boundary transition shared by natural expiry and skip.
    fn finish_phase(&mut self, cause: Cause) {
        self.transition_in_flight = true;
        self.stop_ticking();
        self.seconds_left = 0;

        match self.state {
            TimerState::Working => {
                info!("Working phase finished ({:?})", cause);
                self.enter_resting();
            }
            TimerState::Resting => {
                info!("Resting phase finished ({:?})", cause);
                self.clock.cancel_restore();
                self.overlay_visible = false;
                self.emit(Effect::HideOverlay);
                self.emit(Effect::PlayEndRestSound);
                if cause == Cause::Expired {
                    let message = self.phase.rest_end_prompt.clone();
                    self.notify(NotificationKind::RestEnding, message);
                }
                if self.window_raised {
                    self.window_raised = false;
                    self.emit(Effect::RestoreWindow);
                }

                if self.phase.cycle_enabled {
                    self.enter_working();
                } else {
                    self.enter_idle();
                }
            }
            _ => {}
        }

        self.transition_in_flight = false;
    }

    fn enter_working(&mut self) {
        self.capture_settings();
        let duration = self.settings.work_duration().max(1);
        self.enter_phase(TimerState::Working, duration);
    }

    fn enter_resting(&mut self) {
        self.capture_settings();
        let duration = self.settings.rest_duration().max(1);
        self.enter_phase(TimerState::Resting, duration);

        self.overlay_visible = true;
        self.emit(Effect::PlayStartRestSound);
        let message = self.phase.rest_prompt.clone();
        self.notify(NotificationKind::RestStarting, message);
        self.emit(Effect::ShowOverlay);
        self.emit(Effect::RaiseWindow);
        self.window_raised = true;
        self.clock
            .schedule_restore(self.generation, Duration::from_secs(u64::from(duration)));
    }

    fn enter_phase(&mut self, state: TimerState, duration: u32) {
        self.generation += 1;
        self.state = state;
        self.paused_from = None;
        self.seconds_left = duration;
        self.total_seconds = duration;
        self.overlay_visible = false;
        info!("{} phase started ({})", state, format_mm_ss(duration));
        self.start_ticking();
    }

    fn enter_idle(&mut self) {
        self.generation += 1;
        self.state = TimerState::Idle;
        self.paused_from = None;
        self.seconds_left = 0;
        self.total_seconds = 0;
        self.is_running = false;
        self.overlay_visible = false;
    }

    /// Takes a visible overlay down outside of a rest boundary.
    fn hide_overlay(&mut self) {
        if self.overlay_visible {
            self.overlay_visible = false;
            self.emit(Effect::HideOverlay);
        }
    }

    fn capture_settings(&mut self) {
        let settings = &self.settings;
        self.phase = PhaseSettings {
            cycle_enabled: settings.cycle_enabled(),
            notice_offset: settings.pre_rest_notice_offset(),
            notifications_enabled: settings.notifications_enabled(),
            skip_allowed: settings.skip_allowed(),
            rest_prompt: settings.rest_prompt(),
            rest_end_prompt: settings.rest_end_prompt(),
        };
    }

    fn start_ticking(&mut self) {
        match self.clock.start() {
            Ok(()) => self.is_running = true,
            Err(e) => {
                error!("Clock unavailable, countdown stopped: {}", e);
                self.is_running = false;
            }
        }
    }

    fn stop_ticking(&mut self) {
        self.clock.stop();
        self.is_running = false;
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn guard(&self, command: TimerCommand) -> Result<(), TimerError> {
        if self.transition_in_flight {
            debug!("{} ignored: transition in flight", command);
            return Err(TimerError::ReentrantTransition { command });
        }
        Ok(())
    }

    fn invalid(&self, command: TimerCommand) -> TimerError {
        warn!("Cannot {} while {}", command, self.state);
        TimerError::InvalidTransition {
            command,
            state: self.state,
        }
    }

    fn notify(&mut self, kind: NotificationKind, message: String) {
        if !self.phase.notifications_enabled {
            debug!("Notification {} suppressed", kind.as_str());
            return;
        }
        self.emit(Effect::SendNotification { kind, message });
    }

    fn emit(&mut self, effect: Effect) {
        let name = effect.name();
        if let Err(e) = self.effects.deliver(effect) {
            warn!("Failed to deliver {}: {}", name, e);
        }
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.clock.stop();
        self.clock.cancel_restore();
    }
}

// ============================================================================
// Tests
// ============================================================================
