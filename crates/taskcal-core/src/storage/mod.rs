mod config;
pub mod sheet_db;

pub use config::{CalendarConfig, Config, NotifyConfig, ReconcileSettings, SheetConfig};
pub use sheet_db::SheetDb;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/taskcal[-dev]/` based on TASKCAL_ENV.
///
/// Set TASKCAL_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TASKCAL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("taskcal-dev")
    } else {
        base_dir.join("taskcal")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
