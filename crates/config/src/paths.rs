//! Standard file locations, with process-wide overrides for tests and the
//! `--config-dir` / `--data-dir` CLI flags.

use std::{
    path::PathBuf,
    sync::{OnceLock, RwLock},
};

/// The persisted configuration record.
const CONFIG_FILENAME: &str = "telefwd.json";

/// The opaque session artifact written by the client library. Deleting it
/// forces interactive login on the next start.
const SESSION_FILENAME: &str = "telefwd.session";

fn config_dir_override() -> &'static RwLock<Option<PathBuf>> {
    static OVERRIDE: OnceLock<RwLock<Option<PathBuf>>> = OnceLock::new();
    OVERRIDE.get_or_init(|| RwLock::new(None))
}

fn data_dir_override() -> &'static RwLock<Option<PathBuf>> {
    static OVERRIDE: OnceLock<RwLock<Option<PathBuf>>> = OnceLock::new();
    OVERRIDE.get_or_init(|| RwLock::new(None))
}

/// Override the config directory for this process.
pub fn set_config_dir(path: PathBuf) {
    if let Ok(mut guard) = config_dir_override().write() {
        *guard = Some(path);
    }
}

/// Override the data directory (session artifact location) for this process.
pub fn set_data_dir(path: PathBuf) {
    if let Ok(mut guard) = data_dir_override().write() {
        *guard = Some(path);
    }
}

/// Returns the config directory (`~/.config/telefwd/` unless overridden).
pub fn config_dir() -> PathBuf {
    if let Ok(guard) = config_dir_override().read()
        && let Some(path) = guard.as_ref()
    {
        return path.clone();
    }
    directories::ProjectDirs::from("", "", "telefwd")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the data directory (`~/.local/share/telefwd/` unless overridden).
pub fn data_dir() -> PathBuf {
    if let Ok(guard) = data_dir_override().read()
        && let Some(path) = guard.as_ref()
    {
        return path.clone();
    }
    directories::ProjectDirs::from("", "", "telefwd")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Path of the persisted configuration record.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILENAME)
}

/// Path of the persisted session artifact.
pub fn session_path() -> PathBuf {
    data_dir().join(SESSION_FILENAME)
}
