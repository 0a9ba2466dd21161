use chrono::{NaiveDate, NaiveDateTime};

use crate::calendar::{CalendarEvent, EventOptions, Reminder};
use crate::error::{CalendarError, NotifyError, StoreError};
use crate::task::{LogEntry, TaskRow};

/// Tabular task store: the task sheet plus its audit log.
///
/// Row indices follow sheet semantics: 1-based, the header takes row 1, and
/// deleting a row shifts every later row up by one.
pub trait TaskSheet {
    /// All data rows in sheet order, header skipped.
    fn read_rows(&mut self) -> Result<Vec<TaskRow>, StoreError>;

    /// Overwrite the `event_id` cell (column 5) of `row_index`.
    fn write_event_id(&mut self, row_index: usize, event_id: &str) -> Result<(), StoreError>;

    /// Remove a row; later rows move up.
    fn delete_row(&mut self, row_index: usize) -> Result<(), StoreError>;

    /// Append one row to the audit log.
    fn append_log(&mut self, entry: &LogEntry) -> Result<(), StoreError>;
}

/// Calendar holding one event per open task.
pub trait CalendarStore {
    /// Fetch an event. `Ok(None)` when the id is unknown or the event was deleted.
    fn get_event(&mut self, event_id: &str) -> Result<Option<CalendarEvent>, CalendarError>;

    fn create_all_day_event(
        &mut self,
        subject: &str,
        date: NaiveDate,
        options: &EventOptions,
    ) -> Result<CalendarEvent, CalendarError>;

    fn create_event(
        &mut self,
        subject: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        options: &EventOptions,
    ) -> Result<CalendarEvent, CalendarError>;

    fn set_all_day_date(&mut self, event_id: &str, date: NaiveDate) -> Result<(), CalendarError>;

    fn set_time(
        &mut self,
        event_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<(), CalendarError>;

    /// Replace the event's reminders with exactly `reminders`.
    fn set_notifications(
        &mut self,
        event_id: &str,
        reminders: &[Reminder],
    ) -> Result<(), CalendarError>;

    fn delete_event(&mut self, event_id: &str) -> Result<(), CalendarError>;
}

/// Fire-and-forget text notifications for operators.
pub trait Notifier {
    fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

impl<T: TaskSheet + ?Sized> TaskSheet for &mut T {
    fn read_rows(&mut self) -> Result<Vec<TaskRow>, StoreError> {
        (**self).read_rows()
    }

    fn write_event_id(&mut self, row_index: usize, event_id: &str) -> Result<(), StoreError> {
        (**self).write_event_id(row_index, event_id)
    }

    fn delete_row(&mut self, row_index: usize) -> Result<(), StoreError> {
        (**self).delete_row(row_index)
    }

    fn append_log(&mut self, entry: &LogEntry) -> Result<(), StoreError> {
        (**self).append_log(entry)
    }
}

impl<T: CalendarStore + ?Sized> CalendarStore for &mut T {
    fn get_event(&mut self, event_id: &str) -> Result<Option<CalendarEvent>, CalendarError> {
        (**self).get_event(event_id)
    }

    fn create_all_day_event(
        &mut self,
        subject: &str,
        date: NaiveDate,
        options: &EventOptions,
    ) -> Result<CalendarEvent, CalendarError> {
        (**self).create_all_day_event(subject, date, options)
    }

    fn create_event(
        &mut self,
        subject: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        options: &EventOptions,
    ) -> Result<CalendarEvent, CalendarError> {
        (**self).create_event(subject, start, end, options)
    }

    fn set_all_day_date(&mut self, event_id: &str, date: NaiveDate) -> Result<(), CalendarError> {
        (**self).set_all_day_date(event_id, date)
    }

    fn set_time(
        &mut self,
        event_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<(), CalendarError> {
        (**self).set_time(event_id, start, end)
    }

    fn set_notifications(
        &mut self,
        event_id: &str,
        reminders: &[Reminder],
    ) -> Result<(), CalendarError> {
        (**self).set_notifications(event_id, reminders)
    }

    fn delete_event(&mut self, event_id: &str) -> Result<(), CalendarError> {
        (**self).delete_event(event_id)
    }
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        (**self).notify(text)
    }
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        (**self).notify(text)
    }
}
