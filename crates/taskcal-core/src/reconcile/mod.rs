//! Task log to calendar reconciliation.
//!
//! One run reads the whole task sheet, groups rows by task id and, per group:
//!
//! - **completed task** (latest row carries the completion status): deletes
//!   the most recent event, clears its cell and schedules every row of the
//!   group for removal;
//! - **open task**: updates the most recent event (or creates one) from the
//!   latest row, deletes superseded events and schedules stale rows without
//!   an event for removal.
//!
//! A failing group is reported through the [`Notifier`], written to the audit
//! log and skipped; the run always visits every group. Scheduled rows are
//! deleted at the end in descending order so earlier deletions never shift a
//! row that is still pending.
//!
//! ## Usage
//! ```rust,ignore
//! use taskcal_core::{Reconciler, RunLock, SheetDb};
//!
//! let mut reconciler = Reconciler::new(sheet, calendar, notifier);
//! match reconciler.run(&RunLock::new(lock_path, timeout))? {
//!     RunOutcome::Completed(summary) => println!("{}", summary.message()),
//!     RunOutcome::LockBusy { .. } => println!("another run is in progress"),
//! }
//! ```

pub mod summary;

use chrono::{Local, NaiveDate};

use crate::calendar::{EventOptions, EventSchedule, ScheduleRule};
use crate::error::{ConfigError, CoreError, LockError, ReconcileError};
use crate::integrations::{CalendarStore, Notifier, TaskSheet};
use crate::lock::{RunLock, RunLockGuard};
use crate::storage::ReconcileSettings;
use crate::task::{group_rows, LogEntry, LogOperation, TaskGroup, TaskRow};

pub use summary::{
    EventAction, FailurePhase, GroupFailure, GroupOutcome, ReconcileSummary, RowDeleteFailure,
    RunOutcome,
};

/// Status value marking a task as done.
pub const DEFAULT_COMPLETE_STATUS: &str = "complete";

/// Rules applied during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Latest-row status that marks a task as completed.
    pub complete_status: String,
    /// Placement and reminders for task events.
    pub rule: ScheduleRule,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            complete_status: DEFAULT_COMPLETE_STATUS.to_string(),
            rule: ScheduleRule::default(),
        }
    }
}

impl ReconcileConfig {
    /// Build from the `[reconcile]` section of the config file.
    pub fn from_settings(settings: &ReconcileSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            complete_status: settings.complete_status.clone(),
            rule: settings.schedule_rule()?,
        })
    }

    pub fn with_complete_status(mut self, status: impl Into<String>) -> Self {
        self.complete_status = status.into();
        self
    }

    pub fn with_rule(mut self, rule: ScheduleRule) -> Self {
        self.rule = rule;
        self
    }
}

/// Rows in the order they must be deleted: descending, without duplicates.
pub fn deletion_order(mut rows: Vec<usize>) -> Vec<usize> {
    rows.sort_unstable_by(|a, b| b.cmp(a));
    rows.dedup();
    rows
}

/// Take the run lock, or describe why the run is skipped.
fn acquire_or_busy(lock: &RunLock) -> Result<Result<RunLockGuard, RunOutcome>, CoreError> {
    match lock.acquire() {
        Ok(guard) => Ok(Ok(guard)),
        Err(LockError::Timeout { path, waited_ms }) => {
            tracing::warn!(
                lock = %path.display(),
                waited_ms,
                "another reconcile run is in progress; skipping"
            );
            Ok(Err(RunOutcome::LockBusy {
                lock_path: path,
                waited_ms,
            }))
        }
        Err(e) => Err(e.into()),
    }
}

/// Take the run lock first, then open the collaborators and reconcile.
///
/// `open` is only called once the lock is held, so a skipped run never
/// opens (or migrates) the sheet.
pub fn run_locked<S, C, N, E, F>(lock: &RunLock, open: F) -> Result<RunOutcome, E>
where
    S: TaskSheet,
    C: CalendarStore,
    N: Notifier,
    E: From<CoreError>,
    F: FnOnce() -> Result<Reconciler<S, C, N>, E>,
{
    let _guard = match acquire_or_busy(lock)? {
        Ok(guard) => guard,
        Err(busy) => return Ok(busy),
    };

    let mut reconciler = open()?;
    Ok(RunOutcome::Completed(reconciler.reconcile()?))
}

/// Reconciles a task sheet against a calendar.
pub struct Reconciler<S, C, N> {
    sheet: S,
    calendar: C,
    notifier: N,
    config: ReconcileConfig,
}

impl<S, C, N> Reconciler<S, C, N>
where
    S: TaskSheet,
    C: CalendarStore,
    N: Notifier,
{
    pub fn new(sheet: S, calendar: C, notifier: N) -> Self {
        Self {
            sheet,
            calendar,
            notifier,
            config: ReconcileConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn sheet(&self) -> &S {
        &self.sheet
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn into_parts(self) -> (S, C, N) {
        (self.sheet, self.calendar, self.notifier)
    }

    /// Reconcile under the run lock.
    ///
    /// Lock contention is not an error: the run is skipped and
    /// [`RunOutcome::LockBusy`] returned without touching any store.
    pub fn run(&mut self, lock: &RunLock) -> Result<RunOutcome, CoreError> {
        let _guard = match acquire_or_busy(lock)? {
            Ok(guard) => guard,
            Err(busy) => return Ok(busy),
        };

        self.reconcile().map(RunOutcome::Completed)
    }

    /// Reconcile with today's local date as the scheduling anchor.
    pub fn reconcile(&mut self) -> Result<ReconcileSummary, CoreError> {
        self.reconcile_on(Local::now().date_naive())
    }

    /// Reconcile every task group once.
    ///
    /// Only a failure to read the sheet aborts the run; per-group failures
    /// are collected in the summary.
    pub fn reconcile_on(&mut self, today: NaiveDate) -> Result<ReconcileSummary, CoreError> {
        let rows = self.sheet.read_rows()?;
        let groups = group_rows(rows);
        tracing::info!(groups = groups.len(), %today, "starting reconciliation");

        let mut summary = ReconcileSummary::new(groups.len());
        let mut marked = Vec::new();

        for group in &groups {
            match self.reconcile_group(group, today) {
                Ok(outcome) => {
                    tracing::debug!(task_id = %group.task_id, action = ?outcome.action, "group reconciled");
                    marked.extend(outcome.rows_marked.iter().copied());
                    summary.record(outcome);
                }
                Err(failure) => summary.record_failure(failure),
            }
        }

        for row_index in deletion_order(marked) {
            match self.sheet.delete_row(row_index) {
                Ok(()) => summary.rows_removed += 1,
                Err(e) => {
                    tracing::warn!(row_index, error = %e, "failed to delete sheet row");
                    summary.row_delete_failures.push(RowDeleteFailure {
                        row_index,
                        message: e.to_string(),
                    });
                }
            }
        }

        summary.finished_at = chrono::Utc::now();
        tracing::info!("{}", summary.message());
        Ok(summary)
    }

    fn reconcile_group(
        &mut self,
        group: &TaskGroup,
        today: NaiveDate,
    ) -> Result<GroupOutcome, GroupFailure> {
        if group.is_complete(&self.config.complete_status) {
            self.reconcile_completed(group)
        } else {
            self.reconcile_open(group, today)
        }
    }

    fn reconcile_completed(&mut self, group: &TaskGroup) -> Result<GroupOutcome, GroupFailure> {
        let task_id = group.task_id.as_str();
        let mut action = EventAction::NoEvent;

        if let Some(event_row) = group.existing_events().last().copied() {
            let event_id = event_row.event_id.clone();
            match self.delete_row_event(task_id, event_row, LogOperation::Deleted) {
                Ok(true) => action = EventAction::Deleted { event_id },
                Ok(false) => action = EventAction::AlreadyGone { event_id },
                Err(e) => {
                    return Err(self.report_failure(
                        task_id,
                        &event_row.event_id,
                        FailurePhase::CompleteDelete,
                        &e,
                    ))
                }
            }
        }

        let mut outcome = GroupOutcome::new(task_id, action);
        for row in group.rows() {
            self.mark_for_removal(task_id, row, &mut outcome);
        }
        Ok(outcome)
    }

    fn reconcile_open(
        &mut self,
        group: &TaskGroup,
        today: NaiveDate,
    ) -> Result<GroupOutcome, GroupFailure> {
        let task_id = group.task_id.as_str();
        let latest = group.latest();
        let existing = group.existing_events();

        let action = match self.resolve_event(task_id, latest, &existing, today) {
            Ok(action) => action,
            Err(e) => {
                return Err(self.report_failure(
                    task_id,
                    &latest.event_id,
                    FailurePhase::Resolve,
                    &e,
                ))
            }
        };
        let mut outcome = GroupOutcome::new(task_id, action);

        if let Some((_, older)) = existing.split_last() {
            for row in older {
                match self.delete_row_event(task_id, row, LogOperation::OldEventDeleted) {
                    Ok(true) => outcome.old_events_deleted.push(row.event_id.clone()),
                    Ok(false) => {}
                    Err(e) => {
                        let failure = self.report_failure(
                            task_id,
                            &row.event_id,
                            FailurePhase::OldEventDelete,
                            &e,
                        );
                        outcome.failures.push(failure);
                    }
                }
            }
        }

        for row in group.without_event_id() {
            if row.row_index != latest.row_index {
                self.mark_for_removal(task_id, row, &mut outcome);
            }
        }

        Ok(outcome)
    }

    /// Update the most recent existing event, or create one from `latest`.
    fn resolve_event(
        &mut self,
        task_id: &str,
        latest: &TaskRow,
        existing: &[&TaskRow],
        today: NaiveDate,
    ) -> Result<EventAction, ReconcileError> {
        let schedule = self.config.rule.schedule_for(latest.due_date, today);
        let reminders = self.config.rule.reminders();

        if let Some(event_row) = existing.last() {
            let event_id = event_row.event_id.clone();
            let found = self.calendar.get_event(&event_id)?.is_some();
            if found {
                match schedule {
                    EventSchedule::AllDay { date } => self.calendar.set_all_day_date(&event_id, date)?,
                    EventSchedule::Timed { start, end } => {
                        self.calendar.set_time(&event_id, start, end)?
                    }
                }
                self.calendar.set_notifications(&event_id, &reminders)?;
                self.log(LogEntry::new(LogOperation::Updated, task_id, &event_id));
            } else {
                tracing::warn!(task_id, event_id = %event_id, "event no longer exists; leaving it untouched");
            }
            self.sheet.write_event_id(event_row.row_index, &event_id)?;

            return Ok(if found {
                EventAction::Updated { event_id }
            } else {
                EventAction::UpdateSkipped { event_id }
            });
        }

        let options = EventOptions {
            description: Some(format!("Task ID: {task_id}")),
        };
        let event = match schedule {
            EventSchedule::AllDay { date } => {
                self.calendar
                    .create_all_day_event(&latest.subject, date, &options)?
            }
            EventSchedule::Timed { start, end } => {
                self.calendar
                    .create_event(&latest.subject, start, end, &options)?
            }
        };
        self.calendar.set_notifications(&event.id, &reminders)?;
        self.sheet.write_event_id(latest.row_index, &event.id)?;
        self.log(LogEntry::new(LogOperation::Created, task_id, &event.id));

        Ok(EventAction::Created { event_id: event.id })
    }

    /// Delete the event referenced by `row` (if it still exists) and clear the cell.
    ///
    /// Returns whether an event was actually deleted.
    fn delete_row_event(
        &mut self,
        task_id: &str,
        row: &TaskRow,
        operation: LogOperation,
    ) -> Result<bool, ReconcileError> {
        let deleted = match self.calendar.get_event(&row.event_id)? {
            Some(_) => {
                self.calendar.delete_event(&row.event_id)?;
                self.log(LogEntry::new(operation, task_id, &row.event_id));
                true
            }
            None => {
                tracing::debug!(task_id, event_id = %row.event_id, "event already gone");
                false
            }
        };
        self.sheet.write_event_id(row.row_index, "")?;
        Ok(deleted)
    }

    fn mark_for_removal(&mut self, task_id: &str, row: &TaskRow, outcome: &mut GroupOutcome) {
        outcome.rows_marked.push(row.row_index);
        self.log(LogEntry::new(
            LogOperation::DuplicateRowRemoved,
            task_id,
            &row.event_id,
        ));
    }

    /// Notify, audit and describe a caught failure.
    fn report_failure(
        &mut self,
        task_id: &str,
        event_id: &str,
        phase: FailurePhase,
        err: &ReconcileError,
    ) -> GroupFailure {
        let message = err.to_string();
        tracing::error!(task_id, event_id, ?phase, error = %message, "calendar sync failed");

        let text = match phase {
            FailurePhase::OldEventDelete => {
                format!("Task ID: {task_id}: failed to delete old calendar event: {message}")
            }
            FailurePhase::CompleteDelete | FailurePhase::Resolve => {
                format!("Task ID: {task_id}: calendar sync failed: {message}")
            }
        };
        if let Err(e) = self.notifier.notify(&text) {
            tracing::warn!(task_id, error = %e, "failed to send failure notification");
        }
        self.log(LogEntry::error(task_id, event_id, message.clone()));

        GroupFailure {
            task_id: task_id.to_string(),
            phase,
            event_id: event_id.to_string(),
            message,
        }
    }

    /// Append to the audit log; a failing log never fails the group.
    fn log(&mut self, entry: LogEntry) {
        if let Err(e) = self.sheet.append_log(&entry) {
            tracing::warn!(
                task_id = %entry.task_id,
                operation = %entry.operation,
                error = %e,
                "failed to append audit log entry"
            );
        }
    }
}
