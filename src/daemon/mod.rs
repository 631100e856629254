//! Daemon for the rest timer.
//!
//! This module contains the daemon functionality:
//! - `timer`: interval timer core (state machine, countdown, effects)
//! - `clock`: tick subscription and deferred wakeups
//! - `effects`: side-effect requests and their sinks
//! - `engine`: task that serializes commands and ticks onto the core
//! - `dispatch`: effect logging and hook execution
//! - `ipc`: Unix socket server

pub mod clock;
pub mod dispatch;
pub mod effects;
pub mod engine;
pub mod ipc;
pub mod timer;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::settings::SettingsStore;

pub use clock::{ClockError, ClockEvent, ClockSource, ManualClock, TokioClock};
pub use effects::{Effect, EffectError, EffectSink, MockEffectSink, NotificationKind};
pub use engine::{EngineError, TimerEngine, TimerHandle};
pub use ipc::{default_socket_path, IpcServer, RequestHandler};
pub use timer::{IntervalTimer, TimerError};

/// Runs the daemon until Ctrl-C or SIGTERM.
///
/// Wires the settings store, the timer engine, the effect dispatcher and
/// the IPC server together. The socket file is removed on exit.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or the server fails.
pub async fn run_daemon(socket_path: &Path, settings: Arc<SettingsStore>) -> Result<()> {
    let (effect_tx, effect_rx) = mpsc::unbounded_channel();
    let (timer, engine_task) = TimerEngine::spawn(settings.clone(), Box::new(effect_tx));
    let dispatcher = tokio::spawn(dispatch::run_dispatcher(effect_rx, settings.clone()));

    let server = IpcServer::new(socket_path)?;
    info!("Daemon listening on {}", server.socket_path().display());

    let handler = RequestHandler::new(timer.clone(), settings);
    let result = tokio::select! {
        served = server.serve(handler) => served,
        signal = shutdown_signal() => signal,
    };

    info!("Daemon shutting down");
    timer.shutdown().await;
    engine_task.await.context("Timer engine task panicked")?;
    // The core's sink went away with the engine, so the dispatcher drains and ends.
    let handled = dispatcher.await.context("Effect dispatcher panicked")?;
    info!("Dispatched {} effects", handled);

    drop(server);
    result
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        ctrl_c = tokio::signal::ctrl_c() => ctrl_c.context("Failed to listen for Ctrl-C"),
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")
}
