//! # taskcal Core Library
//!
//! Keeps a calendar in step with an append-only task log. Every change of a
//! task is appended to the log as a new row; a reconcile run turns the latest
//! row of each task into exactly one calendar event, removes events of
//! completed tasks and prunes redundant rows.
//!
//! ## Architecture
//!
//! - **Task**: sheet rows, grouping by task id and the audit log format
//! - **Reconcile**: the per-group decision procedure and run summary
//! - **Integrations**: boundary traits plus Google Calendar and Slack clients
//! - **Storage**: SQLite task sheet and TOML configuration
//! - **Lock**: process-wide exclusive run lock
//!
//! ## Key Components
//!
//! - [`Reconciler`]: drives one run over a [`TaskSheet`], [`CalendarStore`]
//!   and [`Notifier`]
//! - [`SheetDb`]: SQLite-backed task sheet
//! - [`Config`]: application configuration
//! - [`RunLock`]: bounded-wait exclusive lock around a run

pub mod calendar;
pub mod error;
pub mod integrations;
pub mod lock;
pub mod reconcile;
pub mod storage;
pub mod task;

pub use calendar::{CalendarEvent, EventOptions, EventSchedule, Reminder, ReminderMethod, ScheduleRule};
pub use error::{
    CalendarError, ConfigError, CoreError, LockError, NotifyError, ReconcileError, StoreError,
};
pub use integrations::{
    CalendarStore, GoogleCalendar, GoogleCalendarSettings, Notifier, NullNotifier, SlackWebhook,
    TaskSheet,
};
pub use lock::{RunLock, RunLockGuard, DEFAULT_LOCK_TIMEOUT};
pub use reconcile::{
    deletion_order, run_locked, EventAction, FailurePhase, GroupFailure, GroupOutcome,
    ReconcileConfig, ReconcileSummary, Reconciler, RowDeleteFailure, RunOutcome,
};
pub use storage::{Config, SheetDb};
pub use task::{group_rows, LogEntry, LogOperation, TaskGroup, TaskRow};
