//! # Cakeday Channels
//! Push transports for reminders and SMTP for greetings.

pub mod email;
pub mod fcm;
pub mod log;
pub mod webhook;

pub use email::EmailSender;
pub use fcm::{FcmTransport, ServiceAccount};
pub use log::LogTransport;
pub use webhook::WebhookTransport;

use cakeday_core::config::PushConfig;
use cakeday_core::error::{CakedayError, Result};
use cakeday_core::traits::PushTransport;
use std::sync::Arc;

/// Create a push transport from configuration.
pub fn create_transport(config: &PushConfig) -> Result<Arc<dyn PushTransport>> {
    match config.backend.as_str() {
        "fcm" => Ok(Arc::new(FcmTransport::from_config(config)?)),
        "webhook" => {
            let url = config
                .webhook_url
                .as_deref()
                .ok_or_else(|| CakedayError::config("push.webhook_url is required for the webhook backend"))?;
            Ok(Arc::new(WebhookTransport::from_url(url, config.request_timeout_secs)?))
        }
        "log" => Ok(Arc::new(LogTransport::new())),
        other => Err(CakedayError::config(format!("Unknown push backend: {other}"))),
    }
}
