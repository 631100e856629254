//! Serialized execution context for the timer core.
//!
//! One tokio task owns the [`IntervalTimer`]. User commands (from any number
//! of [`TimerHandle`] clones) and clock events arrive as messages and are
//! handled one at a time. After every message the current
//! [`TimerSnapshot`] is published on a `watch` channel.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::clock::{ClockEvent, TokioClock};
use super::effects::EffectSink;
use super::timer::{IntervalTimer, TimerError};
use crate::settings::SettingsProvider;
use crate::types::TimerSnapshot;

/// Capacity of the command queue.
const COMMAND_QUEUE: usize = 32;

// ============================================================================
// EngineError
// ============================================================================

/// Errors returned by [`TimerHandle`] commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The core rejected the command; nothing changed.
    #[error(transparent)]
    Rejected(#[from] TimerError),

    /// The engine task is gone.
    #[error("timer engine is not running")]
    Stopped,
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    StartWorking,
    StartResting,
    Pause,
    Resume,
    Skip(Option<u64>),
    Reset,
}

enum Request {
    Command {
        action: Action,
        reply: oneshot::Sender<Result<TimerSnapshot, TimerError>>,
    },
    Shutdown,
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Spawns and runs the task that owns the timer core.
pub struct TimerEngine {
    timer: IntervalTimer,
    requests: mpsc::Receiver<Request>,
    clock_events: mpsc::UnboundedReceiver<ClockEvent>,
    subscription: watch::Receiver<Option<u64>>,
    snapshots: watch::Sender<TimerSnapshot>,
}

impl TimerEngine {
    /// Spawns the engine task with a [`TokioClock`].
    ///
    /// Must be called from within a tokio runtime. The task ends on
    /// [`TimerHandle::shutdown`] or once every handle is dropped.
    pub fn spawn(
        settings: Arc<dyn SettingsProvider>,
        effects: Box<dyn EffectSink>,
    ) -> (TimerHandle, JoinHandle<()>) {
        let (clock_tx, clock_events) = mpsc::unbounded_channel();
        let clock = TokioClock::new(clock_tx);
        let subscription = clock.subscription();
        let timer = IntervalTimer::new(settings, Box::new(clock), effects);

        let (request_tx, requests) = mpsc::channel(COMMAND_QUEUE);
        let (snapshots, snapshot_rx) = watch::channel(timer.snapshot());

        let engine = Self {
            timer,
            requests,
            clock_events,
            subscription,
            snapshots,
        };
        let task = tokio::spawn(engine.run());

        (
            TimerHandle {
                requests: request_tx,
                snapshots: snapshot_rx,
            },
            task,
        )
    }

    async fn run(mut self) {
        info!("Timer engine started");

        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Command { action, reply }) => {
                        let result = self.apply(action).map(|()| self.timer.snapshot());
                        let _ = reply.send(result);
                    }
                    Some(Request::Shutdown) | None => break,
                },
                Some(event) = self.clock_events.recv() => self.on_clock_event(event),
            }

            self.snapshots.send_replace(self.timer.snapshot());
        }

        info!("Timer engine stopped");
    }

    fn apply(&mut self, action: Action) -> Result<(), TimerError> {
        match action {
            Action::StartWorking => self.timer.start_working(),
            Action::StartResting => self.timer.start_resting(),
            Action::Pause => self.timer.pause(),
            Action::Resume => self.timer.resume(),
            Action::Skip(None) => self.timer.skip(),
            Action::Skip(Some(generation)) => self.timer.skip_phase(generation),
            Action::Reset => {
                self.timer.reset();
                Ok(())
            }
        }
    }

    fn on_clock_event(&mut self, event: ClockEvent) {
        match event {
            ClockEvent::Tick { epoch } => {
                if TokioClock::is_current(&self.subscription, epoch) {
                    self.timer.tick();
                } else {
                    debug!("Dropped tick from stale subscription {}", epoch);
                }
            }
            ClockEvent::RestoreDue { generation } => {
                self.timer.restore_due(generation);
            }
        }
    }
}

// ============================================================================
// TimerHandle
// ============================================================================

/// Cloneable handle for sending commands to the engine.
#[derive(Clone)]
pub struct TimerHandle {
    requests: mpsc::Sender<Request>,
    snapshots: watch::Receiver<TimerSnapshot>,
}

impl TimerHandle {
    /// Starts a working phase from idle.
    pub async fn start_working(&self) -> Result<TimerSnapshot, EngineError> {
        self.send(Action::StartWorking).await
    }

    /// Starts a resting phase from idle or ends the working phase early.
    pub async fn start_resting(&self) -> Result<TimerSnapshot, EngineError> {
        self.send(Action::StartResting).await
    }

    /// Pauses the running phase.
    pub async fn pause(&self) -> Result<TimerSnapshot, EngineError> {
        self.send(Action::Pause).await
    }

    /// Resumes the paused phase.
    pub async fn resume(&self) -> Result<TimerSnapshot, EngineError> {
        self.send(Action::Resume).await
    }

    /// Ends the current phase immediately.
    pub async fn skip(&self) -> Result<TimerSnapshot, EngineError> {
        self.send(Action::Skip(None)).await
    }

    /// Skips only if phase `generation` is still current.
    pub async fn skip_phase(&self, generation: u64) -> Result<TimerSnapshot, EngineError> {
        self.send(Action::Skip(Some(generation))).await
    }

    /// Stops the timer and returns to idle.
    pub async fn reset(&self) -> Result<TimerSnapshot, EngineError> {
        self.send(Action::Reset).await
    }

    /// Returns the latest published snapshot.
    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Returns a receiver notified after every handled command or tick.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshots.clone()
    }

    /// Asks the engine task to stop. Pending and later commands fail with
    /// [`EngineError::Stopped`].
    pub async fn shutdown(&self) {
        let _ = self.requests.send(Request::Shutdown).await;
    }

    async fn send(&self, action: Action) -> Result<TimerSnapshot, EngineError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Command { action, reply })
            .await
            .map_err(|_| EngineError::Stopped)?;
        let result = response.await.map_err(|_| EngineError::Stopped)?;
        Ok(result?)
    }
}
