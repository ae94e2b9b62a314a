//! Webhook transport: POST reminders to an HTTP endpoint.
//!
//! Useful for relaying to push services we don't speak natively (Zapier,
//! n8n, a custom bridge). The endpoint answers 404 or 410 for tokens it
//! will never deliver to.

use async_trait::async_trait;
use cakeday_core::error::{CakedayError, Result};
use cakeday_core::traits::PushTransport;
use cakeday_core::types::{PushMessage, SendOutcome};

pub struct WebhookTransport {
    url: String,
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self { url: url.into(), client }
    }

    pub fn from_url(url: &str, timeout_secs: u64) -> Result<Self> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CakedayError::config(format!("Webhook URL must be http(s): {url}")));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CakedayError::Http(e.to_string()))?;
        Ok(Self::new(url, client))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Outcome for a non-success webhook status.
pub fn classify_status(status: u16, text: &str) -> SendOutcome {
    let reason = format!("Webhook {status}: {text}");
    match status {
        404 | 410 => SendOutcome::PermanentInvalidToken(reason),
        _ => SendOutcome::TransientFailure(reason),
    }
}

#[async_trait]
impl PushTransport for WebhookTransport {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, message: &PushMessage) -> SendOutcome {
        let body = serde_json::json!({
            "token": message.token,
            "title": message.title,
            "body": message.body,
        });

        match self.client.post(&self.url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => SendOutcome::Delivered,
            Ok(resp) => {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                classify_status(status, &text)
            }
            Err(e) => SendOutcome::TransientFailure(format!("Webhook send failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_url() {
        assert!(WebhookTransport::from_url("ftp://example.com", 5).is_err());
        let transport = WebhookTransport::from_url("https://example.com/push", 5).unwrap();
        assert_eq!(transport.url(), "https://example.com/push");
        assert_eq!(transport.name(), "webhook");
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(classify_status(410, "gone"), SendOutcome::PermanentInvalidToken(_)));
        assert!(matches!(classify_status(404, ""), SendOutcome::PermanentInvalidToken(_)));
        assert!(matches!(classify_status(500, "oops"), SendOutcome::TransientFailure(_)));
        assert!(matches!(classify_status(400, "bad"), SendOutcome::TransientFailure(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient() {
        // Port 9 (discard) on localhost is closed on test machines.
        let transport = WebhookTransport::from_url("http://127.0.0.1:9/push", 2).unwrap();
        let outcome = transport.send(&PushMessage::new("tok", "t", "b")).await;
        assert!(matches!(outcome, SendOutcome::TransientFailure(_)));
    }
}
