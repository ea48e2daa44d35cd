//! Which card a given day maps to.
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, Utc};

use crate::error::FillError;

/// Length of the card cycle. Day 366 of a leap year wraps to 1.
pub const CYCLE_DAYS: u32 = 365;

/// Source of "today" for index computation and of sync timestamps.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    fn now(&self) -> DateTime<Utc>;
}

/// Local calendar date of the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same date; `now` is its midnight UTC.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }

    fn now(&self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }
}

/// `(days since Jan 1) mod 365 + 1`, always within `1..=365`.
pub fn for_date(date: NaiveDate) -> i64 {
    i64::from(date.ordinal0() % CYCLE_DAYS + 1)
}

/// Leading integer of `raw`: optional sign, then digits. Anything after the
/// digits is ignored, so `"12abc"` and `"12.9"` are both 12.
pub fn parse_explicit(raw: &str) -> Result<i64, FillError> {
    let trimmed = raw.trim();
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    let sign_len = trimmed.len() - unsigned.len();
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if sign_len > 1 || digits == 0 {
        return Err(FillError::InvalidIndex(raw.to_string()));
    }
    trimmed[..sign_len + digits]
        .parse::<i64>()
        .map_err(|_| FillError::InvalidIndex(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn first_day_is_one() {
        assert_eq!(for_date(ymd(2025, 1, 1)), 1);
        assert_eq!(for_date(ymd(2025, 2, 1)), 32);
    }

    #[test]
    fn last_day_of_common_year_is_365() {
        assert_eq!(for_date(ymd(2025, 12, 31)), 365);
    }

    #[test]
    fn leap_year_wraps_last_day() {
        assert_eq!(for_date(ymd(2024, 12, 30)), 365);
        assert_eq!(for_date(ymd(2024, 12, 31)), 1);
        assert_eq!(for_date(ymd(2024, 3, 1)), 61);
    }

    #[test]
    fn every_day_stays_in_range() {
        let mut day = ymd(2024, 1, 1);
        while day.year() < 2026 {
            let idx = for_date(day);
            assert!((1..=365).contains(&idx), "{day} -> {idx}");
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn fixed_clock_now_is_midnight_utc() {
        let clock = FixedClock(ymd(2025, 3, 1));
        assert_eq!(clock.now().to_rfc3339(), "2025-03-01T00:00:00+00:00");
        assert_eq!(clock.now().date_naive(), clock.today());
    }

    #[test]
    fn explicit_index_parsing() {
        assert_eq!(parse_explicit("7").unwrap(), 7);
        assert_eq!(parse_explicit(" 400 ").unwrap(), 400);
        assert_eq!(parse_explicit("-3").unwrap(), -3);
        assert_eq!(parse_explicit("+4").unwrap(), 4);
    }

    #[test]
    fn explicit_index_keeps_leading_integer() {
        assert_eq!(parse_explicit("12abc").unwrap(), 12);
        assert_eq!(parse_explicit("12.9").unwrap(), 12);
        assert_eq!(parse_explicit("3.5").unwrap(), 3);
        assert_eq!(parse_explicit(" -8 days").unwrap(), -8);
    }

    #[test]
    fn explicit_index_needs_digits() {
        for raw in ["abc", "", "-", "+-3", ".5", "x12"] {
            assert!(
                matches!(parse_explicit(raw), Err(FillError::InvalidIndex(r)) if r == raw),
                "{raw:?}"
            );
        }
    }
}
