//! Calendar arithmetic in the configured timezone.

use cakeday_core::error::{CakedayError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

/// Calendar date of `now` on the wall clock of `tz`.
pub fn local_today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Ledger form of a date: `YYYY-MM-DD`.
pub fn today_str(today: NaiveDate) -> String {
    today.format("%Y-%m-%d").to_string()
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// The date (month, day) falls on in `year`.
///
/// A day past the end of the month is pulled back to the month's last day,
/// so Feb 29 lands on Feb 28 in common years.
pub fn occurrence_in_year(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(CakedayError::invalid(format!("no such anniversary: {month}/{day}")));
    }
    let day = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| CakedayError::invalid(format!("date out of range: {year}-{month}-{day}")))
}

/// Whole days from `today` to the next (month, day), counting today as 0.
///
/// Works on calendar dates only, so DST transitions cannot shave a day off.
pub fn days_until_next_occurrence(month: u32, day: u32, today: NaiveDate) -> Result<i64> {
    let mut next = occurrence_in_year(today.year(), month, day)?;
    if next < today {
        next = occurrence_in_year(today.year() + 1, month, day)?;
    }
    Ok((next - today).num_days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_local_today_crosses_midnight() {
        // 20:30 UTC is already the next day in Kolkata (+05:30).
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 20, 30, 0).unwrap();
        assert_eq!(local_today(now, chrono_tz::Asia::Kolkata), date(2024, 3, 15));
        assert_eq!(local_today(now, chrono_tz::UTC), date(2024, 3, 14));
        assert_eq!(local_today(now, chrono_tz::America::Los_Angeles), date(2024, 3, 14));
    }

    #[test]
    fn test_local_today_across_dst() {
        // Berlin springs forward on 2026-03-29; 00:15 UTC is 01:15 CET.
        let now = Utc.with_ymd_and_hms(2026, 3, 29, 0, 15, 0).unwrap();
        assert_eq!(local_today(now, chrono_tz::Europe::Berlin), date(2026, 3, 29));
        // 22:30 UTC the same day is 00:30 CEST on the 30th.
        let late = Utc.with_ymd_and_hms(2026, 3, 29, 22, 30, 0).unwrap();
        assert_eq!(local_today(late, chrono_tz::Europe::Berlin), date(2026, 3, 30));
    }

    #[test]
    fn test_today_str() {
        assert_eq!(today_str(date(2024, 3, 5)), "2024-03-05");
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2023, 12), 31);
        assert_eq!(days_in_month(2023, 4), 30);
    }

    #[test]
    fn test_basic_countdown() {
        assert_eq!(days_until_next_occurrence(3, 17, date(2024, 3, 15)).unwrap(), 2);
        assert_eq!(days_until_next_occurrence(3, 17, date(2024, 3, 16)).unwrap(), 1);
        assert_eq!(days_until_next_occurrence(3, 17, date(2024, 3, 17)).unwrap(), 0);
        // Passed this year: 2024-03-18 → 2025-03-17.
        assert_eq!(days_until_next_occurrence(3, 17, date(2024, 3, 18)).unwrap(), 364);
    }

    #[test]
    fn test_year_rollover() {
        assert_eq!(days_until_next_occurrence(1, 2, date(2024, 12, 31)).unwrap(), 2);
        assert_eq!(days_until_next_occurrence(1, 1, date(2024, 12, 31)).unwrap(), 1);
    }

    #[test]
    fn test_feb_29_policy() {
        assert_eq!(days_until_next_occurrence(2, 29, date(2023, 2, 28)).unwrap(), 0);
        assert_eq!(days_until_next_occurrence(2, 29, date(2023, 2, 26)).unwrap(), 2);
        assert_eq!(days_until_next_occurrence(2, 29, date(2024, 2, 28)).unwrap(), 1);
        assert_eq!(days_until_next_occurrence(2, 29, date(2024, 2, 29)).unwrap(), 0);
        // After Feb 28 in 2023 the next one is 2024-02-29.
        assert_eq!(days_until_next_occurrence(2, 29, date(2023, 3, 1)).unwrap(), 365);
    }

    #[test]
    fn test_invalid_anniversary() {
        assert!(days_until_next_occurrence(13, 1, date(2024, 1, 1)).is_err());
        assert!(days_until_next_occurrence(1, 0, date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_range_and_zero_property() {
        for year in [2023, 2024] {
            let mut today = date(year, 1, 1);
            while today.year() == year {
                for month in 1..=12u32 {
                    for day in 1..=days_in_month(2024, month) {
                        let left = days_until_next_occurrence(month, day, today).unwrap();
                        assert!((0..=366).contains(&left), "{month}/{day} on {today}: {left}");
                        let resolved = occurrence_in_year(year, month, day).unwrap();
                        assert_eq!(left == 0, resolved == today, "{month}/{day} on {today}");
                    }
                }
                today = today.succ_opt().unwrap();
            }
        }
    }
}
