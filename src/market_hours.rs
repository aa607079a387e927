use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Utc, Weekday};
use thiserror::Error;

/// India Standard Time is a fixed UTC+05:30 with no daylight saving.
const IST_OFFSET_MINUTES: i64 = 5 * 60 + 30;

#[derive(Debug, Error, PartialEq)]
#[error("`{0}` is not a HH:MM time")]
pub struct TimeParseError(pub String);

/// Exchange trading session in IST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for MarketHours {
    fn default() -> Self {
        MarketHours {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl MarketHours {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        MarketHours { open, close }
    }

    /// True on weekdays when the IST wall-clock time is within `open..=close`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        let ist = now.naive_utc() + TimeDelta::minutes(IST_OFFSET_MINUTES);
        if matches!(ist.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let t = ist.time();
        self.open <= t && t <= self.close
    }

    pub fn is_open_now(&self) -> bool {
        self.is_open_at(Utc::now())
    }
}

/// Parse `HH:MM`.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime, TimeParseError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| TimeParseError(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// UTC instant for an IST wall-clock time.
    fn ist(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap() - TimeDelta::minutes(IST_OFFSET_MINUTES)
    }

    #[test]
    fn test_session_bounds_inclusive() {
        let hours = MarketHours::default();
        // 2025-12-09 is a Tuesday
        assert!(!hours.is_open_at(ist(2025, 12, 9, 9, 14)));
        assert!(hours.is_open_at(ist(2025, 12, 9, 9, 15)));
        assert!(hours.is_open_at(ist(2025, 12, 9, 12, 0)));
        assert!(hours.is_open_at(ist(2025, 12, 9, 15, 30)));
        assert!(!hours.is_open_at(ist(2025, 12, 9, 15, 31)));
    }

    #[test]
    fn test_weekend_closed() {
        let hours = MarketHours::default();
        // 2025-12-13 is a Saturday, 2025-12-14 a Sunday
        assert!(!hours.is_open_at(ist(2025, 12, 13, 11, 0)));
        assert!(!hours.is_open_at(ist(2025, 12, 14, 11, 0)));
    }

    #[test]
    fn test_ist_day_boundary() {
        // Monday 00:30 IST is still Sunday in UTC
        let hours = MarketHours::new(NaiveTime::MIN, parse_hhmm("23:59").unwrap());
        assert!(hours.is_open_at(ist(2025, 12, 15, 0, 30)));
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("18:30").unwrap(), NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert!(parse_hhmm("6pm").is_err());
    }
}
