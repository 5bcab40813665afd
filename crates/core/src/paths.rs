//! Centralized path functions for all app storage locations.
//!
//! Single source of truth for where the database and uploaded objects live
//! when no explicit path is configured.

use std::path::PathBuf;

const APP_DIR: &str = "agencydesk";

/// App data root: `~/Library/Application Support/agencydesk/` (macOS) or
/// `~/.local/share/agencydesk/` (Linux).
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR))
}

/// SQLite database file: `<app_data_dir>/agencydesk.db`.
pub fn db_path() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("agencydesk.db"))
}

/// Object storage root: `<app_data_dir>/storage/`. One subdirectory per bucket.
pub fn storage_dir() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("storage"))
}

/// Rolling log files: `<app_data_dir>/logs/`.
pub fn log_dir() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("logs"))
}
