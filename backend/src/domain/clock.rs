//! Time source for the domain layer.
//!
//! Services never read the system clock directly; they ask a [`Clock`] so
//! date-dependent behaviour (autopay, due status, revision tokens) can be
//! pinned in tests.

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Today's date in the user's local calendar
    fn today(&self) -> NaiveDate;

    /// Current instant as epoch milliseconds
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Current instant as an RFC 3339 string with millisecond precision
    fn now_rfc3339(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// The real wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock frozen at a given instant; `today` is taken in UTC.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// Noon UTC on the given date
    pub fn on_date(year: i32, month: u32, day: u32) -> Self {
        let instant = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or_default();
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }

    fn today(&self) -> NaiveDate {
        self.instant.date_naive()
    }
}

pub type SharedClock = Arc<dyn Clock>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_reports_its_date() {
        let clock = FixedClock::on_date(2025, 3, 14);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(clock.now_rfc3339(), "2025-03-14T12:00:00.000Z");
        assert_eq!(clock.now_millis(), clock.now().timestamp_millis());
    }
}
