//! Clock source for the timer core.
//!
//! The core subscribes to one-second ticks with [`ClockSource::start`] and
//! unsubscribes with [`ClockSource::stop`]. It also asks the clock for a
//! single deferred wakeup (the window restore at the end of a rest).
//!
//! [`TokioClock`] delivers both as [`ClockEvent`] messages on a channel so
//! that the engine can handle them on the same task as user commands.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Interval between two ticks.
pub const TICK: Duration = Duration::from_secs(1);

/// Errors raised by a clock source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// The tick generator is gone and cannot be restarted.
    #[error("tick source unavailable: {0}")]
    Unavailable(String),
}

/// Message produced by [`TokioClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One second elapsed in subscription `epoch`.
    Tick { epoch: u64 },
    /// A deferred restore scheduled for phase `generation` is due.
    RestoreDue { generation: u64 },
}

/// Tick subscription and deferred wakeups, controlled by the core.
pub trait ClockSource: Send {
    /// Starts (or restarts) one-second ticks. The first tick arrives one
    /// second after the call.
    fn start(&mut self) -> Result<(), ClockError>;

    /// Stops ticks. Calling it while stopped is fine.
    fn stop(&mut self);

    /// Schedules a restore wakeup for `generation`, replacing any pending one.
    fn schedule_restore(&mut self, generation: u64, after: Duration);

    /// Cancels the pending restore wakeup, if any.
    fn cancel_restore(&mut self);
}

// ============================================================================
// TokioClock
// ============================================================================

/// Clock backed by a tokio ticker task.
///
/// Each [`start`](ClockSource::start) opens a new epoch. Ticks carry the
/// epoch they were produced for, so a consumer can drop ticks that were
/// already queued when the subscription changed (see
/// [`is_current`](TokioClock::is_current)).
pub struct TokioClock {
    events: mpsc::UnboundedSender<ClockEvent>,
    subscription: watch::Sender<Option<u64>>,
    last_epoch: u64,
    ticker: JoinHandle<()>,
    restore: Option<JoinHandle<()>>,
}

impl TokioClock {
    /// Creates the clock and spawns its ticker task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(events: mpsc::UnboundedSender<ClockEvent>) -> Self {
        let (subscription, rx) = watch::channel(None);
        let ticker = tokio::spawn(run_ticker(rx, events.clone()));
        Self {
            events,
            subscription,
            last_epoch: 0,
            ticker,
            restore: None,
        }
    }

    /// Returns a receiver of the current subscription epoch (`None` when stopped).
    pub fn subscription(&self) -> watch::Receiver<Option<u64>> {
        self.subscription.subscribe()
    }

    /// Returns true if a tick of `epoch` belongs to the current subscription.
    pub fn is_current(subscription: &watch::Receiver<Option<u64>>, epoch: u64) -> bool {
        *subscription.borrow() == Some(epoch)
    }
}

impl ClockSource for TokioClock {
    fn start(&mut self) -> Result<(), ClockError> {
        if self.ticker.is_finished() {
            return Err(ClockError::Unavailable("ticker task has stopped".to_string()));
        }
        self.last_epoch += 1;
        self.subscription.send_replace(Some(self.last_epoch));
        debug!("Tick subscription {} started", self.last_epoch);
        Ok(())
    }

    fn stop(&mut self) {
        if self.subscription.send_replace(None).is_some() {
            debug!("Tick subscription {} stopped", self.last_epoch);
        }
    }

    fn schedule_restore(&mut self, generation: u64, after: Duration) {
        self.cancel_restore();
        let events = self.events.clone();
        self.restore = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(ClockEvent::RestoreDue { generation });
        }));
    }

    fn cancel_restore(&mut self) {
        if let Some(handle) = self.restore.take() {
            handle.abort();
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        self.cancel_restore();
        self.ticker.abort();
    }
}

/// Ticker loop: waits for a subscription, then ticks until it changes.
async fn run_ticker(
    mut subscription: watch::Receiver<Option<u64>>,
    events: mpsc::UnboundedSender<ClockEvent>,
) {
    loop {
        let current = *subscription.borrow_and_update();
        let Some(epoch) = current else {
            if subscription.changed().await.is_err() {
                return;
            }
            continue;
        };

        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if events.send(ClockEvent::Tick { epoch }).is_err() {
                        return;
                    }
                }
                changed = subscription.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
            }
        }
    }
}

// ============================================================================
// ManualClock
// ============================================================================

#[derive(Debug, Default)]
struct ManualClockState {
    running: bool,
    starts: u32,
    stops: u32,
    restore: Option<(u64, Duration)>,
    cancelled_restores: u32,
    fail_start: bool,
}

/// Clock driven by hand, for tests.
///
/// It never produces ticks on its own; tests call the core's `tick()`
/// directly and inspect what the core asked of the clock. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualClockState>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `start()` fail.
    pub fn set_fail_start(&self, fail: bool) {
        self.state.lock().unwrap().fail_start = fail;
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    pub fn start_count(&self) -> u32 {
        self.state.lock().unwrap().starts
    }

    pub fn stop_count(&self) -> u32 {
        self.state.lock().unwrap().stops
    }

    /// Returns the pending restore as `(generation, delay)`.
    pub fn pending_restore(&self) -> Option<(u64, Duration)> {
        self.state.lock().unwrap().restore
    }

    pub fn cancelled_restores(&self) -> u32 {
        self.state.lock().unwrap().cancelled_restores
    }
}

impl ClockSource for ManualClock {
    fn start(&mut self) -> Result<(), ClockError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_start {
            return Err(ClockError::Unavailable("manual failure".to_string()));
        }
        state.running = true;
        state.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        state.stops += 1;
    }

    fn schedule_restore(&mut self, generation: u64, after: Duration) {
        self.state.lock().unwrap().restore = Some((generation, after));
    }

    fn cancel_restore(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.restore.take().is_some() {
            state.cancelled_restores += 1;
        }
    }
}
