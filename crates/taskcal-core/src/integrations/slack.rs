//! Slack incoming-webhook notifier for reconciliation failures.

use reqwest::Client;
use serde_json::json;
use tokio::runtime::Runtime;
use url::Url;

use super::blocking_runtime;
use super::traits::Notifier;
use crate::error::NotifyError;

/// Posts `{"text": ...}` to a Slack incoming webhook.
pub struct SlackWebhook {
    webhook_url: Url,
    client: Client,
    rt: Runtime,
}

impl SlackWebhook {
    pub fn new(webhook_url: &str) -> Result<Self, NotifyError> {
        let webhook_url = Url::parse(webhook_url)
            .map_err(|e| NotifyError::InvalidUrl(format!("{webhook_url}: {e}")))?;
        if !matches!(webhook_url.scheme(), "http" | "https") {
            return Err(NotifyError::InvalidUrl(webhook_url.to_string()));
        }
        let rt = blocking_runtime().map_err(|e| NotifyError::Network(e.to_string()))?;
        Ok(Self {
            webhook_url,
            client: Client::new(),
            rt,
        })
    }

    pub fn webhook_url(&self) -> &Url {
        &self.webhook_url
    }
}

impl Notifier for SlackWebhook {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let body = json!({ "text": text });

        let resp = self.rt.block_on(
            self.client
                .post(self.webhook_url.clone())
                .json(&body)
                .send(),
        )?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status().as_u16();
        let body = self.rt.block_on(resp.text()).unwrap_or_default();
        Err(NotifyError::Http { status, body })
    }
}

/// Used when no webhook is configured: the message only goes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(message = text, "no notification webhook configured");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posts_text_payload_as_json() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/services/T/B/X")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(json!({ "text": "Task ID: T1 failed" })))
            .with_status(200)
            .with_body("ok")
            .create();

        let hook = SlackWebhook::new(&format!("{}/services/T/B/X", server.url())).unwrap();
        hook.notify("Task ID: T1 failed").unwrap();

        mock.assert();
    }

    #[test]
    fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/hook")
            .with_status(404)
            .with_body("no_service")
            .create();

        let hook = SlackWebhook::new(&format!("{}/hook", server.url())).unwrap();
        match hook.notify("hello") {
            Err(NotifyError::Http { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "no_service");
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            SlackWebhook::new("not a url"),
            Err(NotifyError::InvalidUrl(_))
        ));
        assert!(matches!(
            SlackWebhook::new("ftp://hooks.example.com/x"),
            Err(NotifyError::InvalidUrl(_))
        ));
    }

    #[test]
    fn null_notifier_always_succeeds() {
        assert!(NullNotifier.notify("anything").is_ok());
    }
}
