//! Per-group outcomes and the run summary.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a group's canonical calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EventAction {
    /// New event created and its id written to the latest row.
    Created { event_id: String },
    /// Existing event rescheduled and its reminders reset.
    Updated { event_id: String },
    /// The referenced event no longer exists; only the cell was rewritten.
    UpdateSkipped { event_id: String },
    /// Completed task: its event was deleted.
    Deleted { event_id: String },
    /// Completed task: its event was already gone; the cell was cleared.
    AlreadyGone { event_id: String },
    /// Completed task without any event.
    NoEvent,
}

/// Stage of group processing that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    /// Deleting the event of a completed task
    CompleteDelete,
    /// Creating or updating the canonical event of an open task
    Resolve,
    /// Deleting a superseded event of an open task
    OldEventDelete,
}

/// A caught failure; already notified and logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFailure {
    pub task_id: String,
    pub phase: FailurePhase,
    pub event_id: String,
    pub message: String,
}

/// Result of one group whose primary step succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOutcome {
    pub task_id: String,
    pub action: EventAction,
    /// Superseded events deleted from the calendar.
    pub old_events_deleted: Vec<String>,
    /// Rows scheduled for removal.
    pub rows_marked: Vec<usize>,
    /// Non-fatal failures (old-event deletions).
    pub failures: Vec<GroupFailure>,
}

impl GroupOutcome {
    pub fn new(task_id: &str, action: EventAction) -> Self {
        Self {
            task_id: task_id.to_string(),
            action,
            old_events_deleted: Vec::new(),
            rows_marked: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// A row that could not be removed during the final pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDeleteFailure {
    pub row_index: usize,
    pub message: String,
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of task groups seen.
    pub groups: usize,
    pub created: usize,
    pub updated: usize,
    /// Events of completed tasks deleted.
    pub events_deleted: usize,
    pub old_events_deleted: usize,
    /// Rows actually removed from the sheet.
    pub rows_removed: usize,
    pub outcomes: Vec<GroupOutcome>,
    /// Every caught failure, including the non-fatal ones of successful groups.
    pub failures: Vec<GroupFailure>,
    pub row_delete_failures: Vec<RowDeleteFailure>,
}

impl ReconcileSummary {
    pub fn new(groups: usize) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            groups,
            created: 0,
            updated: 0,
            events_deleted: 0,
            old_events_deleted: 0,
            rows_removed: 0,
            outcomes: Vec::new(),
            failures: Vec::new(),
            row_delete_failures: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, outcome: GroupOutcome) {
        match &outcome.action {
            EventAction::Created { .. } => self.created += 1,
            EventAction::Updated { .. } => self.updated += 1,
            EventAction::Deleted { .. } => self.events_deleted += 1,
            EventAction::UpdateSkipped { .. }
            | EventAction::AlreadyGone { .. }
            | EventAction::NoEvent => {}
        }
        self.old_events_deleted += outcome.old_events_deleted.len();
        self.failures.extend(outcome.failures.iter().cloned());
        self.outcomes.push(outcome);
    }

    pub(crate) fn record_failure(&mut self, failure: GroupFailure) {
        self.failures.push(failure);
    }

    /// Whether any error was caught during the run.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty() || !self.row_delete_failures.is_empty()
    }

    /// Get a human-readable summary message.
    pub fn message(&self) -> String {
        let mut msg = format!(
            "Reconciled {} task(s): {} created, {} updated, {} deleted, {} old event(s) removed, {} row(s) removed.",
            self.groups,
            self.created,
            self.updated,
            self.events_deleted,
            self.old_events_deleted,
            self.rows_removed,
        );
        let failures = self.failures.len() + self.row_delete_failures.len();
        if failures > 0 {
            msg.push_str(&format!(" {failures} failure(s)."));
        }
        msg
    }
}

/// Outcome of a locked run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(ReconcileSummary),
    /// Another run held the lock; nothing was read or written.
    LockBusy { lock_path: PathBuf, waited_ms: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_actions_and_nested_failures() {
        let mut summary = ReconcileSummary::new(3);
        summary.record(GroupOutcome::new(
            "T1",
            EventAction::Created {
                event_id: "E1".into(),
            },
        ));

        let mut outcome = GroupOutcome::new(
            "T2",
            EventAction::Updated {
                event_id: "E2".into(),
            },
        );
        outcome.old_events_deleted.push("E0".into());
        outcome.failures.push(GroupFailure {
            task_id: "T2".into(),
            phase: FailurePhase::OldEventDelete,
            event_id: "E9".into(),
            message: "boom".into(),
        });
        summary.record(outcome);

        summary.record_failure(GroupFailure {
            task_id: "T3".into(),
            phase: FailurePhase::Resolve,
            event_id: String::new(),
            message: "down".into(),
        });

        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.old_events_deleted, 1);
        assert_eq!(summary.failures.len(), 2);
        assert!(summary.has_failures());
        assert!(summary.message().ends_with("2 failure(s)."));
    }

    #[test]
    fn clean_run_message_has_no_failure_suffix() {
        let summary = ReconcileSummary::new(0);
        assert!(!summary.has_failures());
        assert!(!summary.message().contains("failure"));
    }
}
