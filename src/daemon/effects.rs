//! Side-effect requests emitted by the timer core.
//!
//! The core never plays sounds, shows windows or talks to the OS. It only
//! hands [`Effect`] values to an [`EffectSink`]. Delivery is fire-and-forget:
//! a failed delivery is logged by the core and the countdown carries on.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// Effect
// ============================================================================

/// Kind of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The resting phase just started
    RestStarting,
    /// The resting phase starts in a few seconds
    RestUpcoming,
    /// The resting phase ran out
    RestEnding,
}

impl NotificationKind {
    /// Returns the notification title shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            NotificationKind::RestStarting => "Time to rest",
            NotificationKind::RestUpcoming => "Rest coming up",
            NotificationKind::RestEnding => "Rest is over",
        }
    }

    /// Returns the snake_case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::RestStarting => "rest_starting",
            NotificationKind::RestUpcoming => "rest_upcoming",
            NotificationKind::RestEnding => "rest_ending",
        }
    }
}

/// A side-effect request addressed to the outside world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    PlayStartRestSound,
    PlayEndRestSound,
    SendNotification {
        kind: NotificationKind,
        message: String,
    },
    ShowOverlay,
    HideOverlay,
    RaiseWindow,
    RestoreWindow,
}

impl Effect {
    /// Returns the snake_case name of the effect.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::PlayStartRestSound => "play_start_rest_sound",
            Effect::PlayEndRestSound => "play_end_rest_sound",
            Effect::SendNotification { .. } => "send_notification",
            Effect::ShowOverlay => "show_overlay",
            Effect::HideOverlay => "hide_overlay",
            Effect::RaiseWindow => "raise_window",
            Effect::RestoreWindow => "restore_window",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::SendNotification { kind, message } => {
                write!(f, "{}({}: {})", self.name(), kind.as_str(), message)
            }
            other => f.write_str(other.name()),
        }
    }
}

// ============================================================================
// EffectError
// ============================================================================

/// Errors raised while delivering an effect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// Nobody is listening for effects anymore.
    #[error("effect channel closed")]
    ChannelClosed,

    /// The receiving side refused the effect (e.g. notification permission denied).
    #[error("effect rejected: {0}")]
    Rejected(String),
}

// ============================================================================
// EffectSink
// ============================================================================

/// Receiver of the core's side-effect requests.
///
/// Only [`deliver`](EffectSink::deliver) has to be implemented; the named
/// methods are conveniences matching each effect.
pub trait EffectSink: Send {
    /// Delivers one effect.
    fn deliver(&mut self, effect: Effect) -> Result<(), EffectError>;

    fn play_start_rest_sound(&mut self) -> Result<(), EffectError> {
        self.deliver(Effect::PlayStartRestSound)
    }

    fn play_end_rest_sound(&mut self) -> Result<(), EffectError> {
        self.deliver(Effect::PlayEndRestSound)
    }

    fn send_notification(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Result<(), EffectError>
    where
        Self: Sized,
    {
        self.deliver(Effect::SendNotification {
            kind,
            message: message.into(),
        })
    }

    fn show_overlay(&mut self) -> Result<(), EffectError> {
        self.deliver(Effect::ShowOverlay)
    }

    fn hide_overlay(&mut self) -> Result<(), EffectError> {
        self.deliver(Effect::HideOverlay)
    }

    fn raise_window(&mut self) -> Result<(), EffectError> {
        self.deliver(Effect::RaiseWindow)
    }

    fn restore_window(&mut self) -> Result<(), EffectError> {
        self.deliver(Effect::RestoreWindow)
    }
}

/// The daemon's sink: effects are queued for the dispatcher task.
impl EffectSink for mpsc::UnboundedSender<Effect> {
    fn deliver(&mut self, effect: Effect) -> Result<(), EffectError> {
        self.send(effect).map_err(|_| EffectError::ChannelClosed)
    }
}

// ============================================================================
// MockEffectSink
// ============================================================================

/// Recording sink for tests.
///
/// Clones share the same record, so a test can keep one clone while the
/// timer owns another.
#[derive(Debug, Clone, Default)]
pub struct MockEffectSink {
    delivered: Arc<Mutex<Vec<Effect>>>,
    should_fail: Arc<AtomicBool>,
}

impl MockEffectSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following delivery fail after being recorded.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Returns every effect delivered so far, in order.
    #[must_use]
    pub fn effects(&self) -> Vec<Effect> {
        self.delivered.lock().unwrap().clone()
    }

    /// Returns how many times an effect with this name was delivered.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter(|effect| effect.name() == name)
            .count()
    }

    /// Returns the kinds of all delivered notifications, in order.
    #[must_use]
    pub fn notifications(&self) -> Vec<NotificationKind> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter_map(|effect| match effect {
                Effect::SendNotification { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.delivered.lock().unwrap().clear();
    }
}

impl EffectSink for MockEffectSink {
    fn deliver(&mut self, effect: Effect) -> Result<(), EffectError> {
        self.delivered.lock().unwrap().push(effect);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(EffectError::Rejected("mock failure".to_string()));
        }
        Ok(())
    }
}
