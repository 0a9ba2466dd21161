pub mod google;
pub mod slack;
pub mod traits;

pub use google::{GoogleCalendar, GoogleCalendarSettings};
pub use slack::{NullNotifier, SlackWebhook};
pub use traits::{CalendarStore, Notifier, TaskSheet};

/// Current-thread runtime used by the blocking HTTP integrations.
pub(crate) fn blocking_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "taskcal";

    /// Keyring entry holding the Google Calendar access token.
    pub const GOOGLE_TOKEN: &str = "google_access_token";
    /// Keyring entry holding the Slack incoming-webhook URL.
    pub const SLACK_WEBHOOK: &str = "slack_webhook_url";

    pub fn get(key: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    pub fn delete(key: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
