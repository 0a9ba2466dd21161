//! Google Calendar v3 REST implementation of [`CalendarStore`].
//!
//! Events live in one configured calendar. All-day events use `start.date` /
//! `end.date` with an exclusive end date; timed events are sent as local
//! wall-clock `dateTime` values together with the configured `timeZone`.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tokio::runtime::Runtime;
use url::Url;

use super::blocking_runtime;
use super::traits::CalendarStore;
use crate::calendar::{CalendarEvent, EventOptions, EventSchedule, Reminder, ReminderMethod};
use crate::error::CalendarError;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

const DATE_FORMAT: &str = "%Y-%m-%d";
const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Connection settings for [`GoogleCalendar`].
#[derive(Debug, Clone)]
pub struct GoogleCalendarSettings {
    pub base_url: String,
    pub calendar_id: String,
    pub access_token: String,
    /// IANA zone name used for timed events, e.g. `Asia/Tokyo`.
    pub time_zone: String,
}

pub struct GoogleCalendar {
    base_url: Url,
    calendar_id: String,
    access_token: String,
    time_zone: String,
    client: Client,
    rt: Runtime,
}

impl GoogleCalendar {
    pub fn new(settings: GoogleCalendarSettings) -> Result<Self, CalendarError> {
        if settings.access_token.is_empty() {
            return Err(CalendarError::AuthenticationRequired);
        }
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| CalendarError::Other(format!("invalid base URL {}: {e}", settings.base_url)))?;
        let rt = blocking_runtime().map_err(|e| CalendarError::Network(e.to_string()))?;

        Ok(Self {
            base_url,
            calendar_id: settings.calendar_id,
            access_token: settings.access_token,
            time_zone: settings.time_zone,
            client: Client::new(),
            rt,
        })
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url.as_str().trim_end_matches('/'),
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// Send a request and return the status plus the JSON body (if any).
    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Option<Value>), CalendarError> {
        self.rt.block_on(async {
            let mut req = self
                .client
                .request(method, url)
                .bearer_auth(&self.access_token);
            if let Some(body) = body {
                req = req.json(body);
            }
            let resp = req.send().await?;
            let status = resp.status();
            let text = resp.text().await?;
            let json = if text.trim().is_empty() {
                None
            } else {
                serde_json::from_str(&text).ok()
            };
            Ok::<_, CalendarError>((status, json))
        })
    }

    /// Like [`send`](Self::send) but turns any non-success status into an error.
    fn send_ok(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, CalendarError> {
        let (status, json) = self.send(method, url, body)?;
        if status.is_success() {
            Ok(json)
        } else {
            Err(api_error(status, json.as_ref()))
        }
    }

    fn time_body(&self, schedule: &EventSchedule) -> Value {
        match schedule {
            EventSchedule::AllDay { date } => {
                let end = date.checked_add_days(Days::new(1)).unwrap_or(*date);
                json!({
                    "start": { "date": date.format(DATE_FORMAT).to_string() },
                    "end": { "date": end.format(DATE_FORMAT).to_string() },
                })
            }
            EventSchedule::Timed { start, end } => json!({
                "start": {
                    "dateTime": start.format(LOCAL_DATETIME_FORMAT).to_string(),
                    "timeZone": self.time_zone,
                },
                "end": {
                    "dateTime": end.format(LOCAL_DATETIME_FORMAT).to_string(),
                    "timeZone": self.time_zone,
                },
            }),
        }
    }

    /// Time fields for a PATCH. The API merges nested objects, so the
    /// fields of the other schedule form are nulled explicitly.
    fn patch_time_body(&self, schedule: &EventSchedule) -> Value {
        let mut body = self.time_body(schedule);
        for side in ["start", "end"] {
            match schedule {
                EventSchedule::AllDay { .. } => {
                    body[side]["dateTime"] = Value::Null;
                    body[side]["timeZone"] = Value::Null;
                }
                EventSchedule::Timed { .. } => body[side]["date"] = Value::Null,
            }
        }
        body
    }

    fn insert(
        &self,
        subject: &str,
        schedule: EventSchedule,
        options: &EventOptions,
    ) -> Result<CalendarEvent, CalendarError> {
        let mut body = self.time_body(&schedule);
        body["summary"] = json!(subject);
        if let Some(description) = &options.description {
            body["description"] = json!(description);
        }

        let created = self
            .send_ok(Method::POST, &self.events_url(), Some(&body))?
            .ok_or_else(|| CalendarError::Malformed("empty insert response".into()))?;
        parse_event(&created)
    }

    fn patch(&self, event_id: &str, body: &Value) -> Result<(), CalendarError> {
        self.send_ok(Method::PATCH, &self.event_url(event_id), Some(body))?;
        Ok(())
    }
}

impl CalendarStore for GoogleCalendar {
    fn get_event(&mut self, event_id: &str) -> Result<Option<CalendarEvent>, CalendarError> {
        let (status, json) = self.send(Method::GET, &self.event_url(event_id), None)?;
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(status, json.as_ref()));
        }

        let item = json.ok_or_else(|| CalendarError::Malformed("empty event response".into()))?;
        if item["status"].as_str() == Some("cancelled") {
            return Ok(None);
        }
        parse_event(&item).map(Some)
    }

    fn create_all_day_event(
        &mut self,
        subject: &str,
        date: NaiveDate,
        options: &EventOptions,
    ) -> Result<CalendarEvent, CalendarError> {
        self.insert(subject, EventSchedule::AllDay { date }, options)
    }

    fn create_event(
        &mut self,
        subject: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        options: &EventOptions,
    ) -> Result<CalendarEvent, CalendarError> {
        self.insert(subject, EventSchedule::Timed { start, end }, options)
    }

    fn set_all_day_date(&mut self, event_id: &str, date: NaiveDate) -> Result<(), CalendarError> {
        let body = self.patch_time_body(&EventSchedule::AllDay { date });
        self.patch(event_id, &body)
    }

    fn set_time(
        &mut self,
        event_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<(), CalendarError> {
        let body = self.patch_time_body(&EventSchedule::Timed { start, end });
        self.patch(event_id, &body)
    }

    fn set_notifications(
        &mut self,
        event_id: &str,
        reminders: &[Reminder],
    ) -> Result<(), CalendarError> {
        let overrides: Vec<Value> = reminders
            .iter()
            .map(|r| json!({ "method": r.method.as_str(), "minutes": r.minutes_before }))
            .collect();
        let body = json!({
            "reminders": { "useDefault": false, "overrides": overrides },
        });
        self.patch(event_id, &body)
    }

    fn delete_event(&mut self, event_id: &str) -> Result<(), CalendarError> {
        self.send_ok(Method::DELETE, &self.event_url(event_id), None)?;
        Ok(())
    }
}

fn api_error(status: StatusCode, body: Option<&Value>) -> CalendarError {
    let message = body
        .and_then(|b| b["error"]["message"].as_str())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error"))
        .to_string();
    CalendarError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Convert a Calendar API event resource.
pub fn parse_event(item: &Value) -> Result<CalendarEvent, CalendarError> {
    let id = item["id"]
        .as_str()
        .ok_or_else(|| CalendarError::Malformed("missing event id".into()))?;

    let schedule = if let Some(date) = item["start"]["date"].as_str() {
        EventSchedule::AllDay {
            date: parse_date(date)?,
        }
    } else {
        let start = item["start"]["dateTime"]
            .as_str()
            .ok_or_else(|| CalendarError::Malformed("missing start time".into()))?;
        let end = item["end"]["dateTime"]
            .as_str()
            .ok_or_else(|| CalendarError::Malformed("missing end time".into()))?;
        EventSchedule::Timed {
            start: parse_local_datetime(start)?,
            end: parse_local_datetime(end)?,
        }
    };

    let reminders = item["reminders"]["overrides"]
        .as_array()
        .map(|overrides| {
            overrides
                .iter()
                .filter_map(|o| {
                    let method = match o["method"].as_str()? {
                        "popup" => ReminderMethod::Popup,
                        "email" => ReminderMethod::Email,
                        _ => return None,
                    };
                    let minutes = u32::try_from(o["minutes"].as_u64()?).ok()?;
                    Some(Reminder {
                        method,
                        minutes_before: minutes,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(CalendarEvent {
        id: id.to_string(),
        subject: item["summary"].as_str().unwrap_or_default().to_string(),
        description: item["description"].as_str().map(str::to_string),
        schedule,
        reminders,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| CalendarError::Malformed(format!("invalid date: {s}")))
}

/// RFC 3339 values keep their wall-clock time; offset-less values are taken as-is.
fn parse_local_datetime(s: &str) -> Result<NaiveDateTime, CalendarError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(s, LOCAL_DATETIME_FORMAT)
        .map_err(|_| CalendarError::Malformed(format!("invalid date-time: {s}")))
}
