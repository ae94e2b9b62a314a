//! Which reminder, if any, a record is due for today.

use cakeday_core::error::Result;
use cakeday_core::types::{BirthdayRecord, NotifyCategory};
use chrono::NaiveDate;

use crate::datemath;

/// Category due for `record` on `today`.
///
/// At most one category can be due in a single evaluation since the
/// countdown has exactly one value.
pub fn evaluate(record: &BirthdayRecord, today: NaiveDate) -> Result<Option<NotifyCategory>> {
    let days_left = datemath::days_until_next_occurrence(record.month, record.day, today)?;
    Ok(NotifyCategory::from_days_left(days_left))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cakeday_core::types::LastNotified;

    fn record(month: u32, day: u32) -> BirthdayRecord {
        BirthdayRecord {
            id: "r1".into(),
            name: "Asha".into(),
            month,
            day,
            recipient_token: "tok".into(),
            last_notified: LastNotified::default(),
            created_at: chrono::Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_countdown_categories() {
        let r = record(3, 17);
        assert_eq!(evaluate(&r, date(2024, 3, 14)).unwrap(), None);
        assert_eq!(evaluate(&r, date(2024, 3, 15)).unwrap(), Some(NotifyCategory::TwoDays));
        assert_eq!(evaluate(&r, date(2024, 3, 16)).unwrap(), Some(NotifyCategory::OneDay));
        assert_eq!(evaluate(&r, date(2024, 3, 17)).unwrap(), Some(NotifyCategory::Birthday));
        assert_eq!(evaluate(&r, date(2024, 3, 18)).unwrap(), None);
    }

    #[test]
    fn test_new_year_countdown() {
        let r = record(1, 2);
        assert_eq!(evaluate(&r, date(2024, 12, 31)).unwrap(), Some(NotifyCategory::TwoDays));
        assert_eq!(evaluate(&r, date(2025, 1, 1)).unwrap(), Some(NotifyCategory::OneDay));
    }

    #[test]
    fn test_leap_day_in_common_year() {
        let r = record(2, 29);
        assert_eq!(evaluate(&r, date(2023, 2, 26)).unwrap(), Some(NotifyCategory::TwoDays));
        assert_eq!(evaluate(&r, date(2023, 2, 27)).unwrap(), Some(NotifyCategory::OneDay));
        assert_eq!(evaluate(&r, date(2023, 2, 28)).unwrap(), Some(NotifyCategory::Birthday));
        assert_eq!(evaluate(&r, date(2023, 3, 1)).unwrap(), None);
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        assert!(evaluate(&record(0, 10), date(2024, 1, 1)).is_err());
    }
}
