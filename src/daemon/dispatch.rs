//! Effect dispatcher.
//!
//! Consumes the effects queued by the timer core, logs each one and runs the
//! user hook for it. Runs on its own task so a slow hook never holds up
//! the countdown.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::effects::Effect;
use crate::hooks::run_hook;
use crate::settings::SettingsStore;

/// Handles effects until every sender is dropped. Returns how many were handled.
pub async fn run_dispatcher(
    mut effects: mpsc::UnboundedReceiver<Effect>,
    settings: Arc<SettingsStore>,
) -> usize {
    let mut handled = 0;

    while let Some(effect) = effects.recv().await {
        info!("Effect: {}", effect);
        handled += 1;

        let hook = settings.current().hook;
        if !hook.is_enabled() {
            continue;
        }
        match run_hook(&hook, &effect).await {
            Ok(()) => debug!("Hook finished for {}", effect.name()),
            Err(e) => warn!("Hook failed for {}: {}", effect.name(), e),
        }
    }

    debug!("Effect channel closed after {} effects", handled);
    handled
}
