//! Push notification payloads and delivery outcomes.

use serde::{Deserialize, Serialize};

use super::birthday::NotifyCategory;

/// Default push title for every reminder.
pub const REMINDER_TITLE: &str = "🎉 Birthday Reminder";

/// A single push notification addressed to one device token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
}

impl PushMessage {
    pub fn new(token: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            title: title.into(),
            body: body.into(),
        }
    }

    /// Reminder for `name` in the given category.
    pub fn reminder(token: impl Into<String>, category: NotifyCategory, name: &str) -> Self {
        Self::new(token, REMINDER_TITLE, reminder_body(category, name))
    }
}

/// Fixed per-category templates.
pub fn reminder_body(category: NotifyCategory, name: &str) -> String {
    match category {
        NotifyCategory::TwoDays => format!("⏳ Only 2 days left for {name}'s birthday!"),
        NotifyCategory::OneDay => format!("🎈 Only 1 day left for {name}'s birthday!"),
        NotifyCategory::Birthday => format!("🎂 Today is {name}'s birthday! 🎉"),
    }
}

/// What the push gateway said about one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The token will never work again; the record should be dropped.
    PermanentInvalidToken(String),
    /// Worth retrying on the next pass.
    TransientFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_templates() {
        assert_eq!(
            reminder_body(NotifyCategory::TwoDays, "Ravi"),
            "⏳ Only 2 days left for Ravi's birthday!"
        );
        assert_eq!(
            reminder_body(NotifyCategory::OneDay, "Ravi"),
            "🎈 Only 1 day left for Ravi's birthday!"
        );
        assert_eq!(
            reminder_body(NotifyCategory::Birthday, "Ravi"),
            "🎂 Today is Ravi's birthday! 🎉"
        );
    }

    #[test]
    fn test_reminder_message() {
        let msg = PushMessage::reminder("tok-1", NotifyCategory::Birthday, "Mira");
        assert_eq!(msg.token, "tok-1");
        assert_eq!(msg.title, REMINDER_TITLE);
        assert!(msg.body.contains("Mira"));
    }
}
