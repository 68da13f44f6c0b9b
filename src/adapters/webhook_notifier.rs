//! Chat webhook notifier (Discord-compatible `{"content": ...}` payload).

use crate::domain::error::TurtleError;
use crate::domain::live::truncate_alert;
use crate::ports::notify_port::NotifierPort;
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// `None` when no URL is configured, so alerting degrades to logs.
    pub fn new(url: &str) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() {
            tracing::warn!("webhook notifier is not configured (missing url)");
            return None;
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .ok()?;
        Some(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl NotifierPort for WebhookNotifier {
    fn send(&self, message: &str) -> Result<(), TurtleError> {
        let content = truncate_alert(message);
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { content: &content })
            .send()
            .map_err(|e| TurtleError::Notify {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .unwrap_or_else(|_| "failed to decode error response".to_string());
            return Err(TurtleError::Notify {
                reason: format!("webhook returned {status}: {body}"),
            });
        }
        Ok(())
    }
}
