//! Thread-safe, optionally file-backed settings store.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, info};

use super::{RestSettings, SettingsError, SettingsPatch, SettingsProvider};

/// Directory under the home directory holding settings and the socket.
pub const APP_DIR: &str = ".breather";

/// Settings file name inside [`APP_DIR`].
const SETTINGS_FILE: &str = "settings.json";

/// Returns `~/.breather/settings.json`.
pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    let home = dirs::home_dir().ok_or(SettingsError::NoHomeDirectory)?;
    Ok(home.join(APP_DIR).join(SETTINGS_FILE))
}

/// Settings provider shared between the daemon's IPC handler and the timer core.
#[derive(Debug)]
pub struct SettingsStore {
    current: RwLock<RestSettings>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// Creates a store that lives only in memory.
    pub fn in_memory(settings: RestSettings) -> Self {
        Self {
            current: RwLock::new(settings),
            path: None,
        }
    }

    /// Loads settings from `path`, falling back to defaults when the file
    /// does not exist yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let settings = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| SettingsError::Io {
                path: path.clone(),
                source,
            })?;
            let settings: RestSettings =
                serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
                    path: path.clone(),
                    source,
                })?;
            settings.validate()?;
            debug!("Loaded settings from {}", path.display());
            settings
        } else {
            debug!("No settings file at {}, using defaults", path.display());
            RestSettings::default()
        };

        Ok(Self {
            current: RwLock::new(settings),
            path: Some(path),
        })
    }

    /// Returns the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns a copy of the current settings.
    pub fn current(&self) -> RestSettings {
        self.read().clone()
    }

    /// Applies a partial update and persists it when file-backed.
    ///
    /// The stored settings are only replaced once the patch validated.
    pub fn apply(&self, patch: &SettingsPatch) -> Result<RestSettings, SettingsError> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let next = guard.patched(patch)?;

        if let Some(path) = &self.path {
            save(path, &next)?;
        }

        *guard = next.clone();
        info!("Settings updated");
        Ok(next)
    }

    fn read(&self) -> RwLockReadGuard<'_, RestSettings> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn save(path: &Path, settings: &RestSettings) -> Result<(), SettingsError> {
    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_err)
}

impl SettingsProvider for SettingsStore {
    fn work_duration(&self) -> u32 {
        self.read().work_duration()
    }

    fn rest_duration(&self) -> u32 {
        self.read().rest_duration()
    }

    fn cycle_enabled(&self) -> bool {
        self.read().cycle_enabled()
    }

    fn pre_rest_notice_offset(&self) -> u32 {
        self.read().pre_rest_notice_offset()
    }

    fn notifications_enabled(&self) -> bool {
        self.read().notifications_enabled()
    }

    fn skip_allowed(&self) -> bool {
        self.read().skip_allowed()
    }

    fn rest_prompt(&self) -> String {
        self.read().rest_prompt()
    }

    fn rest_end_prompt(&self) -> String {
        self.read().rest_end_prompt()
    }
}
