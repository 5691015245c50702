//! Business-day arithmetic and the settlement-date rule.

pub mod federal_reserve;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use log::debug;

use crate::error::{CoreError, Result};

pub use federal_reserve::FederalReserveCalendar;

/// Cash for a spot trade is due this many business days out when dealt on a
/// business day before the market cutoff; one more otherwise.
const SPOT_SETTLEMENT_DAYS: i64 = 2;

/// Supplies the closure set for a calendar year.
pub trait HolidaySource: Send + Sync {
    /// Full holiday set for `year`.
    ///
    /// An empty set is a valid answer ("no holidays that year"); a source
    /// that has never loaded the year must fail with
    /// [`CoreError::HolidayDataMissing`] instead.
    fn holidays(&self, year: i32) -> Result<HashSet<NaiveDate>>;
}

/// Fixed holiday table, mainly for tests and ad-hoc calendars.
#[derive(Debug, Default)]
pub struct StaticHolidays {
    by_year: HashMap<i32, HashSet<NaiveDate>>,
}

impl StaticHolidays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `year` loaded with the given closures (possibly none).
    pub fn with_year(mut self, year: i32, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.by_year
            .insert(year, holidays.into_iter().collect());
        self
    }
}

impl HolidaySource for StaticHolidays {
    fn holidays(&self, year: i32) -> Result<HashSet<NaiveDate>> {
        self.by_year
            .get(&year)
            .cloned()
            .ok_or(CoreError::HolidayDataMissing(year))
    }
}

/// Business-day calendar over a holiday source.
///
/// Holiday sets are fetched once per year and cached for the calendar's
/// lifetime; stepping across a year boundary consults the source for the
/// new year on demand.
pub struct SettlementCalendar {
    source: Arc<dyn HolidaySource>,
    market_cutoff: NaiveTime,
    cache: StdMutex<HashMap<i32, HashSet<NaiveDate>>>,
}

impl SettlementCalendar {
    pub fn new(source: Arc<dyn HolidaySource>, market_cutoff: NaiveTime) -> Self {
        Self {
            source,
            market_cutoff,
            cache: StdMutex::new(HashMap::new()),
        }
    }

    fn is_holiday(&self, date: NaiveDate) -> Result<bool> {
        let year = date.year();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(set) = cache.get(&year) {
            return Ok(set.contains(&date));
        }
        let set = self.source.holidays(year)?;
        debug!("loaded {} holidays for {}", set.len(), year);
        let contains = set.contains(&date);
        cache.insert(year, set);
        Ok(contains)
    }

    /// False on weekends and on holidays of the date's year.
    pub fn is_business_day(&self, date: NaiveDate) -> Result<bool> {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Ok(false);
        }
        Ok(!self.is_holiday(date)?)
    }

    /// Steps one calendar day at a time in the sign of `n`, skipping
    /// weekends and holidays, until `|n|` business-day steps are taken.
    pub fn add_business_days(&self, date: NaiveDate, n: i64) -> Result<NaiveDate> {
        let step = if n >= 0 {
            Duration::days(1)
        } else {
            Duration::days(-1)
        };
        let mut remaining = n.abs();
        let mut current = date;
        while remaining > 0 {
            current += step;
            if self.is_business_day(current)? {
                remaining -= 1;
            }
        }
        Ok(current)
    }

    /// Business date the cash of a trade dealt at `traded_at` is due.
    ///
    /// Two business days out when dealt on a business day strictly before
    /// the market cutoff, three otherwise (at-cutoff counts as after).
    /// Counting starts at the first business day strictly after the trade
    /// date, the desk's value-date convention.
    pub fn settlement_date(&self, traded_at: DateTime<Utc>) -> Result<NaiveDate> {
        let trade_date = traded_at.date_naive();
        let before_cutoff = traded_at.time() < self.market_cutoff;
        let days = if before_cutoff && self.is_business_day(trade_date)? {
            SPOT_SETTLEMENT_DAYS
        } else {
            SPOT_SETTLEMENT_DAYS + 1
        };
        let value_start = self.add_business_days(trade_date, 1)?;
        self.add_business_days(value_start, days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fed_calendar() -> SettlementCalendar {
        SettlementCalendar::new(
            Arc::new(FederalReserveCalendar),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekends_are_not_business_days() {
        let cal = fed_calendar();
        assert!(!cal.is_business_day(date(2025, 4, 26)).unwrap()); // Sat
        assert!(!cal.is_business_day(date(2025, 4, 27)).unwrap()); // Sun
        assert!(cal.is_business_day(date(2025, 4, 28)).unwrap()); // Mon
    }

    #[test]
    fn test_holidays_are_not_business_days() {
        let cal = fed_calendar();
        assert!(!cal.is_business_day(date(2024, 7, 4)).unwrap());
        assert!(!cal.is_business_day(date(2025, 12, 25)).unwrap());
    }

    #[test]
    fn test_add_business_days_plain_week() {
        let cal = fed_calendar();
        assert_eq!(
            cal.add_business_days(date(2025, 4, 21), 2).unwrap(),
            date(2025, 4, 23)
        );
    }

    #[test]
    fn test_add_business_days_skips_holiday() {
        let cal = fed_calendar();
        assert_eq!(
            cal.add_business_days(date(2024, 7, 3), 1).unwrap(),
            date(2024, 7, 5)
        );
    }

    #[test]
    fn test_add_business_days_backwards() {
        let cal = fed_calendar();
        // Monday minus one business day lands on Friday.
        assert_eq!(
            cal.add_business_days(date(2025, 4, 28), -1).unwrap(),
            date(2025, 4, 25)
        );
        // Stepping back over July 4th 2024 (Thursday).
        assert_eq!(
            cal.add_business_days(date(2024, 7, 5), -1).unwrap(),
            date(2024, 7, 3)
        );
    }

    #[test]
    fn test_add_business_days_crosses_year_boundary() {
        let cal = fed_calendar();
        // Dec 31 2024 (Tue) + 1 skips Jan 1 2025 (holiday) to Jan 2.
        assert_eq!(
            cal.add_business_days(date(2024, 12, 31), 1).unwrap(),
            date(2025, 1, 2)
        );
    }

    #[test]
    fn test_missing_year_is_an_error_not_an_empty_set() {
        let cal = fed_calendar();
        let err = cal.is_business_day(date(1999, 6, 1)).unwrap_err();
        assert!(matches!(err, CoreError::HolidayDataMissing(1999)));

        let empty_year = SettlementCalendar::new(
            Arc::new(StaticHolidays::new().with_year(2025, [])),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        );
        assert!(empty_year.is_business_day(date(2025, 12, 25)).unwrap());
    }

    #[test]
    fn test_settlement_before_cutoff() {
        let cal = fed_calendar();
        let traded = Utc.with_ymd_and_hms(2025, 4, 23, 15, 59, 59).unwrap();
        assert_eq!(cal.settlement_date(traded).unwrap(), date(2025, 4, 28));
    }

    #[test]
    fn test_settlement_after_cutoff() {
        let cal = fed_calendar();
        let traded = Utc.with_ymd_and_hms(2025, 4, 23, 16, 0, 1).unwrap();
        assert_eq!(cal.settlement_date(traded).unwrap(), date(2025, 4, 29));
    }

    #[test]
    fn test_settlement_exactly_at_cutoff_counts_as_after() {
        let cal = fed_calendar();
        let traded = Utc.with_ymd_and_hms(2025, 4, 23, 16, 0, 0).unwrap();
        assert_eq!(cal.settlement_date(traded).unwrap(), date(2025, 4, 29));
    }

    #[test]
    fn test_settlement_on_non_business_day() {
        let cal = fed_calendar();
        // Saturday trade rolls to Monday, then three business days out.
        let traded = Utc.with_ymd_and_hms(2025, 4, 26, 10, 0, 0).unwrap();
        assert_eq!(cal.settlement_date(traded).unwrap(), date(2025, 5, 1));
    }
}
