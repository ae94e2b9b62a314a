//! Once-per-day bookkeeping for each reminder category.
//!
//! The `lastNotified` map on the record is the only source of truth. A
//! category is satisfied for the day once its key holds today's date; that
//! key is written only after the transport reports delivery.

use cakeday_core::types::{BirthdayRecord, LedgerUpdate, NotifyCategory};

pub fn is_satisfied(record: &BirthdayRecord, category: NotifyCategory, today: &str) -> bool {
    record.last_notified.get(category) == Some(today)
}

/// Mark `category` as sent today on the local copy and return the single
/// key write to commit to the store.
pub fn mark_satisfied(
    record: &mut BirthdayRecord,
    category: NotifyCategory,
    today: &str,
) -> LedgerUpdate {
    record.last_notified.set(category, Some(today.to_string()));
    LedgerUpdate {
        record_id: record.id.clone(),
        category,
        value: Some(today.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cakeday_core::types::LastNotified;

    fn record() -> BirthdayRecord {
        BirthdayRecord {
            id: "r1".into(),
            name: "Asha".into(),
            month: 3,
            day: 17,
            recipient_token: "tok".into(),
            last_notified: LastNotified::default(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_fresh_record_is_unsatisfied() {
        let r = record();
        for category in NotifyCategory::ALL {
            assert!(!is_satisfied(&r, category, "2024-03-15"));
        }
    }

    #[test]
    fn test_mark_then_satisfied_same_day_only() {
        let mut r = record();
        let update = mark_satisfied(&mut r, NotifyCategory::TwoDays, "2024-03-15");

        assert_eq!(update.record_id, "r1");
        assert_eq!(update.category, NotifyCategory::TwoDays);
        assert_eq!(update.value.as_deref(), Some("2024-03-15"));

        assert!(is_satisfied(&r, NotifyCategory::TwoDays, "2024-03-15"));
        assert!(!is_satisfied(&r, NotifyCategory::TwoDays, "2024-03-16"));
        assert!(!is_satisfied(&r, NotifyCategory::OneDay, "2024-03-15"));
    }

    #[test]
    fn test_last_year_does_not_satisfy() {
        let mut r = record();
        r.last_notified.birthday = Some("2023-03-17".into());
        assert!(!is_satisfied(&r, NotifyCategory::Birthday, "2024-03-17"));
    }
}
