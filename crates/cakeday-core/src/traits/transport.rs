//! Push transport trait.

use async_trait::async_trait;

use crate::types::{PushMessage, SendOutcome};

/// Delivers one push notification. Failures are reported through
/// [`SendOutcome`] so callers can tell a dead token from a hiccup.
#[async_trait]
pub trait PushTransport: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &PushMessage) -> SendOutcome;
}
