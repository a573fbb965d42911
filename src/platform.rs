// ReMarkable platform paths
// Resolves per-user config and data directories through `dirs`, with an
// environment override for the data directory.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "remarkable";

/// Environment variable that relocates the data directory (database file).
pub const DATA_DIR_ENV: &str = "REMARKABLE_DATA_DIR";

/// Returns the configuration directory, e.g. `~/.config/remarkable` on Linux.
///
/// Falls back to the current directory when the platform reports none.
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Returns the data directory, e.g. `~/.local/share/remarkable` on Linux.
///
/// `REMARKABLE_DATA_DIR` takes precedence when set.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default location of the SQLite database.
pub fn default_database_path() -> PathBuf {
    get_data_dir().join("remarkable.db")
}
