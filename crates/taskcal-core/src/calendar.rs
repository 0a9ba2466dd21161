//! Calendar event model and the scheduling rule applied to task events.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Default lead time when a task has no due date.
pub const DEFAULT_OFFSET_DAYS: u64 = 7;

/// Reminder offsets written on every task event: one day and three days before.
pub const DEFAULT_REMINDER_MINUTES: [u32; 2] = [1440, 4320];

/// How an event is placed on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventSchedule {
    AllDay { date: NaiveDate },
    /// Local wall-clock times.
    Timed {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Popup,
    Email,
}

impl ReminderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderMethod::Popup => "popup",
            ReminderMethod::Email => "email",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes_before: u32,
}

impl Reminder {
    pub fn popup(minutes_before: u32) -> Self {
        Self {
            method: ReminderMethod::Popup,
            minutes_before,
        }
    }
}

/// Extra fields set when creating an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventOptions {
    pub description: Option<String>,
}

/// An event as seen through a [`CalendarStore`](crate::integrations::CalendarStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub schedule: EventSchedule,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

/// Placement rule for task events.
///
/// A task with a due date becomes an all-day event on that date. Without a
/// due date it becomes a fixed window `offset_days` after today; such an
/// event is never all-day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRule {
    pub offset_days: u64,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub reminder_minutes: Vec<u32>,
}

impl Default for ScheduleRule {
    fn default() -> Self {
        Self {
            offset_days: DEFAULT_OFFSET_DAYS,
            window_start: NaiveTime::from_hms_opt(15, 0, 0).unwrap_or_default(),
            window_end: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
            reminder_minutes: DEFAULT_REMINDER_MINUTES.to_vec(),
        }
    }
}

impl ScheduleRule {
    /// Schedule for a task with the given due date, relative to `today`.
    pub fn schedule_for(&self, due_date: Option<NaiveDate>, today: NaiveDate) -> EventSchedule {
        match due_date {
            Some(date) => EventSchedule::AllDay { date },
            None => {
                let day = today
                    .checked_add_days(Days::new(self.offset_days))
                    .unwrap_or(today);
                EventSchedule::Timed {
                    start: day.and_time(self.window_start),
                    end: day.and_time(self.window_end),
                }
            }
        }
    }

    /// Reminder set written to every task event.
    pub fn reminders(&self) -> Vec<Reminder> {
        self.reminder_minutes
            .iter()
            .map(|&m| Reminder::popup(m))
            .collect()
    }
}
