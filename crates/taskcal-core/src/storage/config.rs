//! TOML-based application configuration.
//!
//! Stores:
//! - Location of the task sheet database
//! - Google Calendar target and credentials
//! - Slack webhook for failure notifications
//! - Reconciliation rules (completion status, default placement, reminders)
//!
//! Configuration is stored at `~/.config/taskcal/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::calendar::{ScheduleRule, DEFAULT_OFFSET_DAYS, DEFAULT_REMINDER_MINUTES};
use crate::error::ConfigError;
use crate::integrations::google::DEFAULT_BASE_URL;

const TIME_FORMAT: &str = "%H:%M";

/// Task sheet location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetConfig {
    /// SQLite file; defaults to `tasks.db` in the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Target calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Falls back to the OS keyring when unset.
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Failure notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Falls back to the OS keyring when unset; no webhook means log only.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Reconciliation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSettings {
    #[serde(default = "default_complete_status")]
    pub complete_status: String,
    #[serde(default = "default_offset_days")]
    pub offset_days: u64,
    /// `HH:MM`, local time.
    #[serde(default = "default_window_start")]
    pub window_start: String,
    /// `HH:MM`, local time.
    #[serde(default = "default_window_end")]
    pub window_end: String,
    #[serde(default = "default_reminder_minutes")]
    pub reminder_minutes: Vec<u32>,
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/taskcal/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub reconcile: ReconcileSettings,
}

// Default functions
fn default_calendar_id() -> String {
    "primary".into()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_time_zone() -> String {
    "UTC".into()
}
fn default_complete_status() -> String {
    "complete".into()
}
fn default_offset_days() -> u64 {
    DEFAULT_OFFSET_DAYS
}
fn default_window_start() -> String {
    "15:00".into()
}
fn default_window_end() -> String {
    "16:00".into()
}
fn default_reminder_minutes() -> Vec<u32> {
    DEFAULT_REMINDER_MINUTES.to_vec()
}
fn default_lock_timeout_secs() -> u64 {
    30
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: default_calendar_id(),
            base_url: default_base_url(),
            time_zone: default_time_zone(),
            access_token: None,
        }
    }
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            complete_status: default_complete_status(),
            offset_days: default_offset_days(),
            window_start: default_window_start(),
            window_end: default_window_end(),
            reminder_minutes: default_reminder_minutes(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

impl ReconcileSettings {
    /// Parse the placement settings into a [`ScheduleRule`].
    pub fn schedule_rule(&self) -> Result<ScheduleRule, ConfigError> {
        let window_start = parse_time("reconcile.window_start", &self.window_start)?;
        let window_end = parse_time("reconcile.window_end", &self.window_end)?;
        if window_end <= window_start {
            return Err(ConfigError::InvalidValue {
                key: "reconcile.window_end".into(),
                message: format!(
                    "must be after window_start ({})",
                    self.window_start
                ),
            });
        }

        Ok(ScheduleRule {
            offset_days: self.offset_days,
            window_start,
            window_end,
            reminder_minutes: self.reminder_minutes.clone(),
        })
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}

fn parse_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|e| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("expected HH:MM, got {value:?} ({e})"),
    })
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }
        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;
                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ if value.is_empty() => serde_json::Value::Null,
                    _ => serde_json::Value::String(value.into()),
                };
                obj.insert(part.to_string(), new_value);
                return Ok(());
            }
            current = current.get_mut(part).ok_or_else(unknown)?;
        }
        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load a config file from an explicit location.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by dot-separated key without saving.
    ///
    /// An empty value clears optional settings.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            // An empty value only clears optional keys.
            message: if value.is_empty() {
                "must not be empty".to_string()
            } else {
                e.to_string()
            },
        })?;
        updated.reconcile.schedule_rule()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Task sheet database location.
    pub fn sheet_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.sheet.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("tasks.db")),
        }
    }

    /// Lock file serializing reconcile runs against the same sheet.
    pub fn lock_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.sheet_path()?.with_extension("lock"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_rules() {
        let cfg = Config::default();
        assert_eq!(cfg.reconcile.complete_status, "complete");
        assert_eq!(cfg.reconcile.lock_timeout(), Duration::from_secs(30));

        let rule = cfg.reconcile.schedule_rule().unwrap();
        assert_eq!(rule, ScheduleRule::default());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [calendar]
            calendar_id = "team@group.calendar.google.com"

            [reconcile]
            complete_status = "done"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.calendar.calendar_id, "team@group.calendar.google.com");
        assert_eq!(cfg.calendar.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.reconcile.complete_status, "done");
        assert_eq!(cfg.reconcile.reminder_minutes, vec![1440, 4320]);
        assert!(cfg.notify.webhook_url.is_none());
    }

    #[test]
    fn set_and_get_by_dotted_key() {
        let mut cfg = Config::default();
        cfg.set_value("reconcile.offset_days", "3").unwrap();
        cfg.set_value("notify.webhook_url", "https://hooks.slack.com/services/x")
            .unwrap();
        cfg.set_value("reconcile.reminder_minutes", "[60]").unwrap();

        assert_eq!(cfg.get("reconcile.offset_days").as_deref(), Some("3"));
        assert_eq!(
            cfg.notify.webhook_url.as_deref(),
            Some("https://hooks.slack.com/services/x")
        );
        assert_eq!(cfg.reconcile.reminder_minutes, vec![60]);

        cfg.set_value("notify.webhook_url", "").unwrap();
        assert!(cfg.notify.webhook_url.is_none());
    }

    #[test]
    fn empty_value_only_clears_optional_keys() {
        let mut cfg = Config::default();
        match cfg.set_value("reconcile.complete_status", "") {
            Err(ConfigError::InvalidValue { key, message }) => {
                assert_eq!(key, "reconcile.complete_status");
                assert_eq!(message, "must not be empty");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
        assert_eq!(cfg.reconcile.complete_status, "complete");

        cfg.set_value("notify.webhook_url", "").unwrap();
        assert!(cfg.notify.webhook_url.is_none());
    }

    #[test]
    fn rejects_unknown_keys_and_bad_windows() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("reconcile.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set_value("reconcile.window_end", "14:00"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.reconcile.window_end, "16:00");
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.sheet.path = Some(dir.path().join("tasks.db"));
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.sheet_path().unwrap(), dir.path().join("tasks.db"));
        assert_eq!(loaded.lock_path().unwrap(), dir.path().join("tasks.lock"));
    }
}
