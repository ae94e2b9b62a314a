//! Birthday records and the per-category notification ledger.

use serde::{Deserialize, Serialize};

use crate::error::{CakedayError, Result};

/// Longest day each month can have (leap year February).
const MAX_DAYS: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Reminder category. Each one is sent at most once per local day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NotifyCategory {
    #[serde(rename = "2days")]
    TwoDays,
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "birthday")]
    Birthday,
}

impl NotifyCategory {
    pub const ALL: [NotifyCategory; 3] = [Self::TwoDays, Self::OneDay, Self::Birthday];

    /// Ledger key used in the persisted `lastNotified` map.
    pub fn key(&self) -> &'static str {
        match self {
            Self::TwoDays => "2days",
            Self::OneDay => "1day",
            Self::Birthday => "birthday",
        }
    }

    /// Category due when the anniversary is `days_left` days away.
    pub fn from_days_left(days_left: i64) -> Option<Self> {
        match days_left {
            2 => Some(Self::TwoDays),
            1 => Some(Self::OneDay),
            0 => Some(Self::Birthday),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotifyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Last local day (`YYYY-MM-DD`) each category was successfully delivered.
///
/// All three keys are always serialized; `null` means never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastNotified {
    #[serde(rename = "2days", default)]
    pub two_days: Option<String>,
    #[serde(rename = "1day", default)]
    pub one_day: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
}

impl LastNotified {
    pub fn get(&self, category: NotifyCategory) -> Option<&str> {
        match category {
            NotifyCategory::TwoDays => self.two_days.as_deref(),
            NotifyCategory::OneDay => self.one_day.as_deref(),
            NotifyCategory::Birthday => self.birthday.as_deref(),
        }
    }

    pub fn set(&mut self, category: NotifyCategory, value: Option<String>) {
        match category {
            NotifyCategory::TwoDays => self.two_days = value,
            NotifyCategory::OneDay => self.one_day = value,
            NotifyCategory::Birthday => self.birthday = value,
        }
    }

    /// Whether a persisted value already has the three-key shape.
    pub fn is_normalized(value: &serde_json::Value) -> bool {
        value.as_object().is_some_and(|obj| {
            NotifyCategory::ALL
                .iter()
                .all(|c| obj.get(c.key()).is_some_and(|v| v.is_null() || v.is_string()))
        })
    }

    /// Read a persisted value, accepting the legacy single-date form.
    ///
    /// A legacy scalar date was only ever written by day-of reminders, so it
    /// lands in the `birthday` slot. Applying this to an already normalized
    /// value returns it unchanged.
    pub fn normalize(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(obj) => {
                let field = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(String::from);
                Self {
                    two_days: field("2days"),
                    one_day: field("1day"),
                    birthday: field("birthday"),
                }
            }
            serde_json::Value::String(date) if !date.is_empty() => Self {
                birthday: Some(date.clone()),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

/// A stored birthday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BirthdayRecord {
    pub id: String,
    pub name: String,
    pub month: u32,
    pub day: u32,
    pub recipient_token: String,
    #[serde(default)]
    pub last_notified: LastNotified,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input for creating a record. The store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBirthday {
    pub name: String,
    pub month: u32,
    pub day: u32,
    pub recipient_token: String,
}

impl NewBirthday {
    pub fn new(
        name: impl Into<String>,
        month: u32,
        day: u32,
        recipient_token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            month,
            day,
            recipient_token: recipient_token.into(),
        }
    }

    /// Reject empty fields and (month, day) pairs that never occur.
    /// February 29 is accepted.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CakedayError::invalid("name must not be empty"));
        }
        if self.recipient_token.trim().is_empty() {
            return Err(CakedayError::invalid("recipient token must not be empty"));
        }
        if !(1..=12).contains(&self.month) {
            return Err(CakedayError::invalid(format!("month out of range: {}", self.month)));
        }
        let max_day = MAX_DAYS[(self.month - 1) as usize];
        if self.day == 0 || self.day > max_day {
            return Err(CakedayError::invalid(format!(
                "day {} does not exist in month {}",
                self.day, self.month
            )));
        }
        Ok(())
    }
}

/// Targeted write of one ledger key on one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerUpdate {
    pub record_id: String,
    pub category: NotifyCategory,
    pub value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_from_days_left() {
        assert_eq!(NotifyCategory::from_days_left(2), Some(NotifyCategory::TwoDays));
        assert_eq!(NotifyCategory::from_days_left(1), Some(NotifyCategory::OneDay));
        assert_eq!(NotifyCategory::from_days_left(0), Some(NotifyCategory::Birthday));
        assert_eq!(NotifyCategory::from_days_left(3), None);
        assert_eq!(NotifyCategory::from_days_left(-1), None);
    }

    #[test]
    fn test_last_notified_serializes_all_keys() {
        let ln = LastNotified::default();
        let value = serde_json::to_value(&ln).unwrap();
        assert_eq!(value, json!({"2days": null, "1day": null, "birthday": null}));
        assert!(LastNotified::is_normalized(&value));
    }

    #[test]
    fn test_normalize_legacy_scalar() {
        let ln = LastNotified::normalize(&json!("2024-03-17"));
        assert_eq!(ln.birthday.as_deref(), Some("2024-03-17"));
        assert_eq!(ln.two_days, None);
        assert_eq!(ln.one_day, None);
        assert!(!LastNotified::is_normalized(&json!("2024-03-17")));
    }

    #[test]
    fn test_normalize_null_and_idempotent() {
        assert_eq!(LastNotified::normalize(&serde_json::Value::Null), LastNotified::default());

        let once = LastNotified::normalize(&json!("2024-01-01"));
        let twice = LastNotified::normalize(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_partial_object() {
        let value = json!({"1day": "2024-05-01"});
        assert!(!LastNotified::is_normalized(&value));
        let ln = LastNotified::normalize(&value);
        assert_eq!(ln.get(NotifyCategory::OneDay), Some("2024-05-01"));
        assert_eq!(ln.get(NotifyCategory::Birthday), None);
    }

    #[test]
    fn test_set_touches_one_key() {
        let mut ln = LastNotified::default();
        ln.set(NotifyCategory::TwoDays, Some("2024-03-15".into()));
        assert_eq!(ln.get(NotifyCategory::TwoDays), Some("2024-03-15"));
        assert_eq!(ln.get(NotifyCategory::OneDay), None);
        assert_eq!(ln.get(NotifyCategory::Birthday), None);
    }

    #[test]
    fn test_validate() {
        assert!(NewBirthday::new("Asha", 2, 29, "tok").validate().is_ok());
        assert!(NewBirthday::new("Asha", 12, 31, "tok").validate().is_ok());
        assert!(NewBirthday::new("Asha", 2, 30, "tok").validate().is_err());
        assert!(NewBirthday::new("Asha", 4, 31, "tok").validate().is_err());
        assert!(NewBirthday::new("Asha", 13, 1, "tok").validate().is_err());
        assert!(NewBirthday::new("Asha", 1, 0, "tok").validate().is_err());
        assert!(NewBirthday::new(" ", 1, 1, "tok").validate().is_err());
        assert!(NewBirthday::new("Asha", 1, 1, "").validate().is_err());
    }
}
