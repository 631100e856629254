//! User hook run for every effect.
//!
//! The daemon has no sound or window backend of its own. Users who want
//! something to happen when a rest starts (play a sound, dim the screen,
//! post a desktop notification) configure a program here; it is started
//! once per effect with the effect described in its environment.
//!
//! Hook failures never affect the timer.

mod config;
mod error;
mod runner;

pub use config::HookConfig;
pub use error::HookError;
pub use runner::{run_hook, ENV_EFFECT, ENV_MESSAGE, ENV_NOTIFICATION};
