//! Holiday calendar lookups for occurrence generation and exclusion.
//!
//! The calendar is an injected capability: generation and exclusion code
//! takes `&dyn HolidayCalendar` so tests can substitute a fixed fake and
//! deployments can swap the data source. Lookups outside the loaded
//! horizon answer [`DayKnowledge::Unknown`]; callers degrade gracefully
//! (unknown is treated as "not a holiday").

mod loader;
mod table;

pub use loader::{load_dir, load_year_str, LoaderError};
pub use table::{CalendarEntry, CalendarTable};

use chrono::{Datelike, NaiveDate, Weekday};

/// Markers attached to a calendar date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayMarks {
    /// Official holiday.
    pub is_holiday: bool,
    /// Weekend date officially shifted to be a workday.
    pub is_adjusted_workday: bool,
}

/// Result of a calendar lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKnowledge {
    /// The date falls inside the loaded horizon.
    Known(DayMarks),
    /// The date falls outside the loaded horizon.
    Unknown,
}

/// Read-only holiday/workday lookup over a bounded horizon.
pub trait HolidayCalendar: Send + Sync {
    fn lookup(&self, date: NaiveDate) -> DayKnowledge;
}

/// A calendar with no data loaded: every lookup is `Unknown`.
///
/// With this calendar, workday walking falls back to weekends-only and
/// holiday exclusion is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCalendar;

impl HolidayCalendar for NoCalendar {
    fn lookup(&self, _date: NaiveDate) -> DayKnowledge {
        DayKnowledge::Unknown
    }
}

/// Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Workday test: not a holiday, and either a weekday or an officially
/// adjusted weekend workday. Unknown dates count as workdays on weekdays.
pub fn is_workday(calendar: &dyn HolidayCalendar, date: NaiveDate) -> bool {
    match calendar.lookup(date) {
        DayKnowledge::Known(marks) => {
            !marks.is_holiday && (!is_weekend(date) || marks.is_adjusted_workday)
        }
        DayKnowledge::Unknown => !is_weekend(date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn weekend_detection() {
        assert!(is_weekend(d("2025-08-23"))); // Saturday
        assert!(is_weekend(d("2025-08-24"))); // Sunday
        assert!(!is_weekend(d("2025-08-25"))); // Monday
    }

    #[test]
    fn no_calendar_is_unknown_everywhere() {
        assert_eq!(NoCalendar.lookup(d("2025-01-01")), DayKnowledge::Unknown);
        // Weekdays still count as workdays without data.
        assert!(is_workday(&NoCalendar, d("2025-08-25")));
        assert!(!is_workday(&NoCalendar, d("2025-08-23")));
    }

    #[test]
    fn holiday_is_not_a_workday() {
        let table = CalendarTable::from_entries(
            d("2025-01-01"),
            d("2025-12-31"),
            vec![CalendarEntry {
                date: d("2025-01-01"),
                is_holiday: true,
                is_adjusted_workday: false,
            }],
        );
        assert!(!is_workday(&table, d("2025-01-01")));
        assert!(is_workday(&table, d("2025-01-02")));
    }

    #[test]
    fn adjusted_workday_on_weekend_counts() {
        let table = CalendarTable::from_entries(
            d("2025-01-01"),
            d("2025-12-31"),
            vec![CalendarEntry {
                date: d("2025-08-23"), // Saturday
                is_holiday: false,
                is_adjusted_workday: true,
            }],
        );
        assert!(is_workday(&table, d("2025-08-23")));
        assert!(!is_workday(&table, d("2025-08-24")));
    }
}
