//! Core error types for taskcal-core.
//!
//! Every collaborator of the reconciler has its own error enum so callers can
//! tell a calendar failure from a sheet failure. [`CoreError`] wraps them for
//! operations that abort a whole run.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for taskcal-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Tabular store errors
    #[error("Sheet error: {0}")]
    Store(#[from] StoreError),

    /// Calendar store errors
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// Notification sink errors
    #[error("Notify error: {0}")]
    Notify(#[from] NotifyError),

    /// Process lock errors
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tabular store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the sheet database
    #[error("Failed to open sheet at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Sheet file is locked by another connection
    #[error("Sheet is locked")]
    Locked,

    /// A row index that does not address a data row
    #[error("Row {0} does not exist")]
    RowOutOfRange(usize),

    /// A stored cell could not be decoded
    #[error("Invalid {column} in row {row}: {value:?}")]
    InvalidCell {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Calendar store errors.
#[derive(Error, Debug)]
pub enum CalendarError {
    /// API returned a non-success status
    #[error("Calendar API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not have the expected shape
    #[error("Malformed calendar response: {0}")]
    Malformed(String),

    /// No access token configured
    #[error("Calendar access token is not configured")]
    AuthenticationRequired,

    /// Event id unknown to the store (mock/in-memory stores)
    #[error("Event not found: {0}")]
    NotFound(String),

    /// Anything else a store implementation wants to surface
    #[error("{0}")]
    Other(String),
}

/// Notification sink errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Webhook error (HTTP {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),
}

/// Process lock errors.
#[derive(Error, Debug)]
pub enum LockError {
    /// Another run holds the lock for longer than the wait budget
    #[error("Lock at {path} still held after {waited_ms}ms")]
    Timeout { path: PathBuf, waited_ms: u64 },

    /// Failed to open or lock the lock file
    #[error("Failed to lock {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while reconciling one task group. Never aborts the run.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read or write the config file
    #[error("Failed to access config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Home/data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// Unknown dotted key
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for CalendarError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CalendarError::Malformed(err.to_string())
        } else {
            CalendarError::Network(err.to_string())
        }
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Network(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
