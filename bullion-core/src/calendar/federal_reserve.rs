//! Federal Reserve closure calendar.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::HolidaySource;
use crate::error::{CoreError, Result};

/// Federal Reserve Bank closures, the holiday authority for USD cash
/// settlement.
///
/// Holidays falling on a Saturday are not observed on a weekday (the Banks
/// stay open the preceding Friday), so they are absent from the table;
/// Sunday holidays appear as the observed Monday.
#[derive(Debug, Default)]
pub struct FederalReserveCalendar;

impl HolidaySource for FederalReserveCalendar {
    fn holidays(&self, year: i32) -> Result<HashSet<NaiveDate>> {
        let month_days: &[(u32, u32)] = match year {
            2024 => &[
                (1, 1),   // New Year's Day
                (1, 15),  // Martin Luther King Jr. Day
                (2, 19),  // Washington's Birthday
                (5, 27),  // Memorial Day
                (6, 19),  // Juneteenth
                (7, 4),   // Independence Day
                (9, 2),   // Labor Day
                (10, 14), // Columbus Day
                (11, 11), // Veterans Day
                (11, 28), // Thanksgiving
                (12, 25), // Christmas
            ],
            2025 => &[
                (1, 1),
                (1, 20),
                (2, 17),
                (5, 26),
                (6, 19),
                (7, 4),
                (9, 1),
                (10, 13),
                (11, 11),
                (11, 27),
                (12, 25),
            ],
            2026 => &[
                (1, 1),
                (1, 19),
                (2, 16),
                (5, 25),
                (6, 19),
                // Jul 4 falls on a Saturday; the Banks are open Jul 3.
                (9, 7),
                (10, 12),
                (11, 11),
                (11, 26),
                (12, 25),
            ],
            _ => return Err(CoreError::HolidayDataMissing(year)),
        };
        Ok(month_days
            .iter()
            .filter_map(|&(month, day)| NaiveDate::from_ymd_opt(year, month, day))
            .collect())
    }
}
