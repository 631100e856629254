//! Integration tests for daemon-CLI IPC communication.
//!
//! Each test wires a real timer engine, request handler and socket server
//! together and drives them through the public client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use breather::cli::IpcClient;
use breather::daemon::{Effect, IpcServer, NotificationKind, RequestHandler, TimerEngine};
use breather::settings::{RestSettings, SettingsPatch, SettingsStore};
use breather::types::{Phase, TimerState};

// ============================================================================
// Test Helpers
// ============================================================================

struct Harness {
    client: IpcClient,
    effects: mpsc::UnboundedReceiver<Effect>,
    server: JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn start(settings: RestSettings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket_path: PathBuf = dir.path().join("breather.sock");

        let store = Arc::new(SettingsStore::in_memory(settings));
        let (effect_tx, effects) = mpsc::unbounded_channel();
        let (timer, _engine) = TimerEngine::spawn(store.clone(), Box::new(effect_tx));

        let server = IpcServer::new(&socket_path).unwrap();
        let handler = RequestHandler::new(timer, store);
        let server = tokio::spawn(async move {
            let _ = server.serve(handler).await;
        });

        Self {
            client: IpcClient::with_socket_path(socket_path),
            effects,
            server,
            _dir: dir,
        }
    }

    fn drain_effects(&mut self) -> Vec<Effect> {
        let mut drained = Vec::new();
        while let Ok(effect) = self.effects.try_recv() {
            drained.push(effect);
        }
        drained
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn state_of(response: &breather::IpcResponse) -> TimerState {
    response.snapshot().expect("snapshot in response").state
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_start_pause_resume_reset() {
    let harness = Harness::start(RestSettings::default());
    let client = &harness.client;

    let started = client.start().await.unwrap();
    assert_eq!(started.message, "Working phase started");
    assert_eq!(state_of(&started), TimerState::Working);
    assert_eq!(started.snapshot().unwrap().seconds_left, 1200);

    let paused = client.pause().await.unwrap();
    let snapshot = paused.snapshot().unwrap();
    assert_eq!(snapshot.state, TimerState::Paused);
    assert_eq!(snapshot.paused_from, Some(Phase::Working));
    assert!(!snapshot.is_running);

    let resumed = client.resume().await.unwrap();
    assert_eq!(state_of(&resumed), TimerState::Working);

    let reset = client.reset().await.unwrap();
    assert_eq!(state_of(&reset), TimerState::Idle);
    assert_eq!(reset.snapshot().unwrap().seconds_left, 0);
}

#[tokio::test]
async fn test_invalid_transition_is_reported() {
    let harness = Harness::start(RestSettings::default());

    let err = harness.client.pause().await.unwrap_err();

    assert_eq!(err.to_string(), "cannot pause while idle");
    let status = harness.client.status().await.unwrap();
    assert_eq!(state_of(&status), TimerState::Idle);
}

#[tokio::test]
async fn test_skip_work_enters_rest() {
    let mut harness = Harness::start(RestSettings::default().with_rest_seconds(30));

    harness.client.start().await.unwrap();
    let skipped = harness.client.skip(None).await.unwrap();

    let snapshot = skipped.snapshot().unwrap();
    assert_eq!(snapshot.state, TimerState::Resting);
    assert_eq!(snapshot.seconds_left, 30);
    assert!(snapshot.overlay_visible);

    let effects = harness.drain_effects();
    assert!(effects.contains(&Effect::ShowOverlay));
    assert!(effects.contains(&Effect::PlayStartRestSound));
    assert!(effects.iter().any(|effect| matches!(
        effect,
        Effect::SendNotification {
            kind: NotificationKind::RestStarting,
            ..
        }
    )));
}

#[tokio::test]
async fn test_stale_skip_is_rejected() {
    let harness = Harness::start(RestSettings::default());

    let started = harness.client.start().await.unwrap();
    let generation = started.snapshot().unwrap().generation;
    harness.client.skip(Some(generation)).await.unwrap();

    assert!(harness.client.skip(Some(generation)).await.is_err());
    let status = harness.client.status().await.unwrap();
    assert_eq!(state_of(&status), TimerState::Resting);
}

#[tokio::test]
async fn test_double_skip_of_same_phase_applies_once() {
    let mut harness = Harness::start(RestSettings::default().with_cycle(true));
    harness.client.rest().await.unwrap();
    let generation = harness
        .client
        .status()
        .await
        .unwrap()
        .snapshot()
        .unwrap()
        .generation;
    harness.drain_effects();

    let (first, second) = tokio::join!(
        harness.client.skip(Some(generation)),
        harness.client.skip(Some(generation))
    );

    assert!(first.is_ok() != second.is_ok());
    let status = harness.client.status().await.unwrap();
    assert_eq!(state_of(&status), TimerState::Working);

    let effects = harness.drain_effects();
    let count = |wanted: &Effect| effects.iter().filter(|e| *e == wanted).count();
    assert_eq!(count(&Effect::HideOverlay), 1);
    assert_eq!(count(&Effect::PlayEndRestSound), 1);
    assert_eq!(count(&Effect::ShowOverlay), 0);
}

#[tokio::test]
async fn test_pause_and_reset_take_the_overlay_down() {
    let mut harness = Harness::start(RestSettings::default());
    harness.client.rest().await.unwrap();
    harness.drain_effects();

    harness.client.pause().await.unwrap();
    harness.client.resume().await.unwrap();
    harness.client.reset().await.unwrap();

    assert_eq!(
        harness.drain_effects(),
        vec![
            Effect::HideOverlay,
            Effect::ShowOverlay,
            Effect::HideOverlay,
            Effect::RestoreWindow,
        ]
    );
}

#[tokio::test]
async fn test_strict_mode_blocks_rest_skip() {
    let harness = Harness::start(RestSettings::default());
    harness
        .client
        .configure(SettingsPatch {
            skip_allowed: Some(false),
            ..SettingsPatch::default()
        })
        .await
        .unwrap();

    harness.client.rest().await.unwrap();
    let err = harness.client.skip(None).await.unwrap_err();

    assert_eq!(err.to_string(), "skipping the rest is disabled");
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
async fn test_configure_applies_from_next_phase() {
    let harness = Harness::start(RestSettings::default());
    let client = &harness.client;

    client.start().await.unwrap();
    let configured = client
        .configure(SettingsPatch {
            work_seconds: Some(300),
            ..SettingsPatch::default()
        })
        .await
        .unwrap();
    let settings = configured.data.unwrap().settings.unwrap();
    assert_eq!(settings.work_seconds, 300);

    // The running phase keeps its length.
    let status = client.status().await.unwrap();
    assert_eq!(status.snapshot().unwrap().total_seconds, 1200);

    client.reset().await.unwrap();
    let restarted = client.start().await.unwrap();
    assert_eq!(restarted.snapshot().unwrap().total_seconds, 300);
}

#[tokio::test]
async fn test_configure_rejects_out_of_range() {
    let harness = Harness::start(RestSettings::default());

    let result = harness
        .client
        .configure(SettingsPatch {
            rest_seconds: Some(7200),
            ..SettingsPatch::default()
        })
        .await;

    assert!(result.is_err());
    let current = harness.client.settings().await.unwrap();
    assert_eq!(current.data.unwrap().settings.unwrap().rest_seconds, 20);
}

#[tokio::test]
async fn test_configure_zero_keeps_previous_value() {
    let harness = Harness::start(RestSettings::default());

    let configured = harness
        .client
        .configure(SettingsPatch {
            work_seconds: Some(0),
            rest_seconds: Some(45),
            ..SettingsPatch::default()
        })
        .await
        .unwrap();

    let settings = configured.data.unwrap().settings.unwrap();
    assert_eq!(settings.work_seconds, 1200);
    assert_eq!(settings.rest_seconds, 45);
}

// ============================================================================
// Countdown
// ============================================================================

#[tokio::test]
async fn test_short_cycle_runs_to_idle() {
    let settings = RestSettings::default()
        .with_work_seconds(1)
        .with_rest_seconds(1);
    let mut harness = Harness::start(settings);

    harness.client.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let status = harness.client.status().await.unwrap();
    assert_eq!(state_of(&status), TimerState::Resting);

    tokio::time::sleep(Duration::from_millis(1200)).await;
    let status = harness.client.status().await.unwrap();
    assert_eq!(state_of(&status), TimerState::Idle);
    assert!(!status.snapshot().unwrap().overlay_visible);

    let effects = harness.drain_effects();
    assert!(effects.contains(&Effect::HideOverlay));
    assert!(effects.contains(&Effect::PlayEndRestSound));
    assert!(effects.iter().any(|effect| matches!(
        effect,
        Effect::SendNotification {
            kind: NotificationKind::RestEnding,
            ..
        }
    )));
}

// ============================================================================
// Connection Errors
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_no_daemon_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let client = IpcClient::with_socket_path(dir.path().join("nobody.sock"));

    let err = client.status().await.unwrap_err();

    assert!(format!("{:#}", err).contains("breather daemon"));
}
