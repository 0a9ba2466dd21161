//! Audit log entries written for every sheet/calendar mutation or failure.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of operation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOperation {
    /// New calendar event created for an open task
    Created,
    /// Existing calendar event rescheduled
    Updated,
    /// Event of a completed task deleted
    Deleted,
    /// Superseded event of an open task deleted
    OldEventDeleted,
    /// Redundant sheet row scheduled for removal
    DuplicateRowRemoved,
    /// A caught failure
    Error,
}

impl LogOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogOperation::Created => "created",
            LogOperation::Updated => "updated",
            LogOperation::Deleted => "deleted",
            LogOperation::OldEventDeleted => "old event deleted",
            LogOperation::DuplicateRowRemoved => "duplicate row removed",
            LogOperation::Error => "error",
        }
    }
}

impl fmt::Display for LogOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(LogOperation::Created),
            "updated" => Ok(LogOperation::Updated),
            "deleted" => Ok(LogOperation::Deleted),
            "old event deleted" => Ok(LogOperation::OldEventDeleted),
            "duplicate row removed" => Ok(LogOperation::DuplicateRowRemoved),
            "error" => Ok(LogOperation::Error),
            other => Err(format!("unknown log operation: {other}")),
        }
    }
}

/// One audit log row: `[timestamp, operation, task_id, event_id, error]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: LogOperation,
    pub task_id: String,
    pub event_id: String,
    /// Empty unless `operation` is [`LogOperation::Error`].
    pub error: String,
}

impl LogEntry {
    pub fn new(operation: LogOperation, task_id: &str, event_id: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            task_id: task_id.to_string(),
            event_id: event_id.to_string(),
            error: String::new(),
        }
    }

    pub fn error(task_id: &str, event_id: &str, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            ..Self::new(LogOperation::Error, task_id, event_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_names_parse_back() {
        for op in [
            LogOperation::Created,
            LogOperation::Updated,
            LogOperation::Deleted,
            LogOperation::OldEventDeleted,
            LogOperation::DuplicateRowRemoved,
            LogOperation::Error,
        ] {
            assert_eq!(op.as_str().parse::<LogOperation>().unwrap(), op);
        }
        assert!("renamed".parse::<LogOperation>().is_err());
    }

    #[test]
    fn error_entry_carries_message() {
        let entry = LogEntry::error("T1", "E1", "boom");
        assert_eq!(entry.operation, LogOperation::Error);
        assert_eq!(entry.error, "boom");
        assert!(LogEntry::new(LogOperation::Created, "T1", "E1").error.is_empty());
    }
}
