//! Five-field cron expressions evaluated in a local timezone.
//!
//! Fields: minute, hour, day-of-month, month, day-of-week (0 or 7 = Sunday).
//! Each field accepts `*`, `n`, `a-b`, `a,b,c`, and a `/step` suffix on `*`
//! or a range. When both day fields are restricted a day matches if either
//! does, like classic cron.

use cakeday_core::error::{CakedayError, Result};
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// How far ahead `next_after` searches before giving up.
const SEARCH_DAYS: i64 = 366 * 4 + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expr: String,
    minutes: u64,
    hours: u32,
    days_of_month: u32,
    months: u16,
    days_of_week: u8,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields.as_slice() else {
            return Err(CakedayError::InvalidSchedule(format!(
                "expected 5 fields, got {}: {expr}",
                fields.len()
            )));
        };

        let weekdays = parse_field(dow, 0, 7)?;
        // Fold 7 onto Sunday.
        let weekdays = (weekdays | (weekdays >> 7)) & 0x7f;

        Ok(Self {
            expr: expr.trim().to_string(),
            minutes: parse_field(minute, 0, 59)?,
            hours: parse_field(hour, 0, 23)? as u32,
            days_of_month: parse_field(dom, 1, 31)? as u32,
            months: parse_field(month, 1, 12)? as u16,
            days_of_week: weekdays as u8,
            dom_restricted: *dom != "*",
            dow_restricted: *dow != "*",
        })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        if self.months & (1 << date.month()) == 0 {
            return false;
        }
        let dom = self.days_of_month & (1 << date.day()) != 0;
        let dow = self.days_of_week & (1 << date.weekday().num_days_from_sunday()) != 0;
        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom || dow,
            (true, false) => dom,
            (false, true) => dow,
            (false, false) => true,
        }
    }

    /// Whether a local wall-clock minute matches.
    pub fn matches(&self, local: NaiveDateTime) -> bool {
        self.day_matches(local.date())
            && self.hours & (1 << local.hour()) != 0
            && self.minutes & (1 << local.minute()) != 0
    }

    /// First matching instant strictly after `after`, read on the wall clock
    /// of `tz`. Wall times skipped by a DST jump never fire; repeated ones
    /// fire at their first occurrence.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let start = after.with_timezone(&tz).naive_local();
        let start = start.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let limit = start + Duration::days(SEARCH_DAYS);

        let mut candidate = start;
        while candidate < limit {
            if !self.day_matches(candidate.date()) {
                candidate = candidate.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if self.hours & (1 << candidate.hour()) == 0 {
                candidate = candidate.with_minute(0)? + Duration::hours(1);
                continue;
            }
            if self.minutes & (1 << candidate.minute()) != 0 {
                let resolved = match tz.from_local_datetime(&candidate) {
                    LocalResult::Single(dt) => Some(dt),
                    LocalResult::Ambiguous(first, _) => Some(first),
                    LocalResult::None => None,
                };
                if let Some(dt) = resolved.map(|dt| dt.with_timezone(&Utc)) {
                    if dt > after {
                        return Some(dt);
                    }
                }
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

impl std::fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expr)
    }
}

/// Parse one field into a bitmask with bit `n` set for each allowed value.
fn parse_field(field: &str, min: u32, max: u32) -> Result<u64> {
    let invalid = || CakedayError::InvalidSchedule(format!("bad field '{field}' (allowed {min}-{max})"));
    let mut mask = 0u64;

    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step.parse().map_err(|_| invalid())?;
                if step == 0 {
                    return Err(invalid());
                }
                (range, step)
            }
            None => (part, 1),
        };

        let (lo, hi) = if range == "*" {
            (min, max)
        } else if let Some((lo, hi)) = range.split_once('-') {
            (
                lo.parse::<u32>().map_err(|_| invalid())?,
                hi.parse::<u32>().map_err(|_| invalid())?,
            )
        } else {
            let value = range.parse::<u32>().map_err(|_| invalid())?;
            // `n/step` runs from n to the end of the field.
            (value, if step > 1 { max } else { value })
        };

        if lo < min || hi > max || lo > hi {
            return Err(invalid());
        }
        let mut value = lo;
        while value <= hi {
            mask |= 1 << value;
            value += step;
        }
    }
    Ok(mask)
}
