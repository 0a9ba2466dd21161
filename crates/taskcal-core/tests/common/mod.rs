//! Shared fixtures for reconciliation tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use taskcal_core::{
    CalendarError, CalendarEvent, CalendarStore, EventOptions, EventSchedule, LogEntry,
    LogOperation, Notifier, NotifyError, Reminder, SheetDb, StoreError, TaskRow, TaskSheet,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Fixed "today" used by every scenario.
pub fn today() -> NaiveDate {
    date(2026, 10, 18)
}

// ============================================================================
// Sheet helpers
// ============================================================================

/// `(subject, due_date, task_id, status, event_id)`
pub type RowFixture<'a> = (&'a str, Option<NaiveDate>, &'a str, &'a str, &'a str);

pub fn sheet_with(rows: &[RowFixture<'_>]) -> SheetDb {
    let db = SheetDb::open_memory().unwrap();
    for (subject, due, task_id, status, event_id) in rows {
        db.append_row(subject, *due, task_id, status, event_id).unwrap();
    }
    db
}

pub fn rows_of(sheet: &mut impl TaskSheet) -> Vec<TaskRow> {
    sheet.read_rows().unwrap()
}

pub fn log_ops(sheet: &SheetDb) -> Vec<(LogOperation, String, String)> {
    sheet
        .log_entries(None)
        .unwrap()
        .into_iter()
        .map(|e| (e.operation, e.task_id, e.event_id))
        .collect()
}

/// Sheet wrapper that fails selected row deletions or every log append.
pub struct FlakySheet {
    pub inner: SheetDb,
    pub failing_deletes: HashSet<usize>,
    pub fail_log: bool,
}

impl FlakySheet {
    pub fn new(inner: SheetDb) -> Self {
        Self {
            inner,
            failing_deletes: HashSet::new(),
            fail_log: false,
        }
    }
}

impl TaskSheet for FlakySheet {
    fn read_rows(&mut self) -> Result<Vec<TaskRow>, StoreError> {
        self.inner.read_rows()
    }

    fn write_event_id(&mut self, row_index: usize, event_id: &str) -> Result<(), StoreError> {
        self.inner.write_event_id(row_index, event_id)
    }

    fn delete_row(&mut self, row_index: usize) -> Result<(), StoreError> {
        if self.failing_deletes.contains(&row_index) {
            return Err(StoreError::QueryFailed(format!("cannot delete row {row_index}")));
        }
        self.inner.delete_row(row_index)
    }

    fn append_log(&mut self, entry: &LogEntry) -> Result<(), StoreError> {
        if self.fail_log {
            return Err(StoreError::Locked);
        }
        self.inner.append_log(entry)
    }
}

// ============================================================================
// Mock calendar
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarOp {
    Get,
    Create,
    SetDate,
    SetTime,
    SetNotifications,
    Delete,
}

/// In-memory calendar with call recording and failure injection.
///
/// Failures are keyed by operation and event id; creations are keyed by
/// subject since no id exists yet.
#[derive(Default)]
pub struct MockCalendar {
    pub events: BTreeMap<String, CalendarEvent>,
    pub calls: Vec<(CalendarOp, String)>,
    failures: HashSet<(CalendarOp, String)>,
    next_id: u32,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(mut self, id: &str, subject: &str) -> Self {
        self.events.insert(
            id.to_string(),
            CalendarEvent {
                id: id.to_string(),
                subject: subject.to_string(),
                description: None,
                schedule: EventSchedule::AllDay { date: date(2026, 1, 1) },
                reminders: Vec::new(),
            },
        );
        self
    }

    pub fn fail(mut self, op: CalendarOp, key: &str) -> Self {
        self.failures.insert((op, key.to_string()));
        self
    }

    pub fn calls_of(&self, op: CalendarOp) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, id)| id.as_str())
            .collect()
    }

    fn enter(&mut self, op: CalendarOp, key: &str) -> Result<(), CalendarError> {
        self.calls.push((op, key.to_string()));
        if self.failures.contains(&(op, key.to_string())) {
            return Err(CalendarError::Other(format!("injected {op:?} failure for {key}")));
        }
        Ok(())
    }

    fn event_mut(&mut self, event_id: &str) -> Result<&mut CalendarEvent, CalendarError> {
        self.events
            .get_mut(event_id)
            .ok_or_else(|| CalendarError::NotFound(event_id.to_string()))
    }

    fn create(
        &mut self,
        subject: &str,
        schedule: EventSchedule,
        options: &EventOptions,
    ) -> Result<CalendarEvent, CalendarError> {
        self.enter(CalendarOp::Create, subject)?;
        self.next_id += 1;
        let event = CalendarEvent {
            id: format!("evt-{}", self.next_id),
            subject: subject.to_string(),
            description: options.description.clone(),
            schedule,
            reminders: Vec::new(),
        };
        self.events.insert(event.id.clone(), event.clone());
        Ok(event)
    }
}

impl CalendarStore for MockCalendar {
    fn get_event(&mut self, event_id: &str) -> Result<Option<CalendarEvent>, CalendarError> {
        self.enter(CalendarOp::Get, event_id)?;
        Ok(self.events.get(event_id).cloned())
    }

    fn create_all_day_event(
        &mut self,
        subject: &str,
        date: NaiveDate,
        options: &EventOptions,
    ) -> Result<CalendarEvent, CalendarError> {
        self.create(subject, EventSchedule::AllDay { date }, options)
    }

    fn create_event(
        &mut self,
        subject: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        options: &EventOptions,
    ) -> Result<CalendarEvent, CalendarError> {
        self.create(subject, EventSchedule::Timed { start, end }, options)
    }

    fn set_all_day_date(&mut self, event_id: &str, date: NaiveDate) -> Result<(), CalendarError> {
        self.enter(CalendarOp::SetDate, event_id)?;
        self.event_mut(event_id)?.schedule = EventSchedule::AllDay { date };
        Ok(())
    }

    fn set_time(
        &mut self,
        event_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<(), CalendarError> {
        self.enter(CalendarOp::SetTime, event_id)?;
        self.event_mut(event_id)?.schedule = EventSchedule::Timed { start, end };
        Ok(())
    }

    fn set_notifications(
        &mut self,
        event_id: &str,
        reminders: &[Reminder],
    ) -> Result<(), CalendarError> {
        self.enter(CalendarOp::SetNotifications, event_id)?;
        self.event_mut(event_id)?.reminders = reminders.to_vec();
        Ok(())
    }

    fn delete_event(&mut self, event_id: &str) -> Result<(), CalendarError> {
        self.enter(CalendarOp::Delete, event_id)?;
        self.events
            .remove(event_id)
            .map(|_| ())
            .ok_or_else(|| CalendarError::NotFound(event_id.to_string()))
    }
}

// ============================================================================
// Notifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        self.messages.borrow_mut().push(text.to_string());
        if self.fail {
            return Err(NotifyError::Http {
                status: 500,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}
