//! Dry-run transport: logs each reminder and reports it delivered.

use async_trait::async_trait;
use cakeday_core::traits::PushTransport;
use cakeday_core::types::{PushMessage, SendOutcome};
use std::sync::Mutex;

#[derive(Default)]
pub struct LogTransport {
    sent: Mutex<Vec<PushMessage>>,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages "sent" so far, oldest first.
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PushTransport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &PushMessage) -> SendOutcome {
        tracing::info!(token = %message.token, "📨 {}: {}", message.title, message.body);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        SendOutcome::Delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_transport_records() {
        let transport = LogTransport::new();
        let outcome = transport.send(&PushMessage::new("tok", "hi", "there")).await;
        assert_eq!(outcome, SendOutcome::Delivered);
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.sent()[0].body, "there");
    }
}
