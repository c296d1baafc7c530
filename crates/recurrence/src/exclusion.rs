//! Exclusion filtering over generated candidate dates.
//!
//! Exclusion is drop-only: an excluded occurrence is removed, never shifted
//! to a make-up date. When holiday data is unavailable for a date, holiday
//! exclusion degrades to a no-op for that date and the pass logs a single
//! warning; weekend exclusion is always computable.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::warn;

use cadence_calendar::{is_weekend, DayKnowledge, HolidayCalendar};
use cadence_core::rule::Exclusions;

/// Remove candidate dates per the rule's exclusion policy.
pub fn apply_exclusions(
    dates: BTreeSet<NaiveDate>,
    exclusions: &Exclusions,
    calendar: &dyn HolidayCalendar,
) -> BTreeSet<NaiveDate> {
    let mut unknown_count = 0usize;

    let kept: BTreeSet<NaiveDate> = dates
        .into_iter()
        .filter(|&date| {
            if exclusions.specific_dates.contains(&date) {
                return false;
            }

            if exclusions.exclude_weekends && is_weekend(date) {
                let adjusted = matches!(
                    calendar.lookup(date),
                    DayKnowledge::Known(marks) if marks.is_adjusted_workday
                );
                if !adjusted {
                    return false;
                }
            }

            if exclusions.exclude_holidays {
                match calendar.lookup(date) {
                    DayKnowledge::Known(marks) if marks.is_holiday => return false,
                    DayKnowledge::Known(_) => {}
                    DayKnowledge::Unknown => unknown_count += 1,
                }
            }

            true
        })
        .collect();

    if unknown_count > 0 {
        warn!(
            dates = unknown_count,
            "holiday data unavailable, holiday exclusion degraded to no-op for these dates"
        );
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_calendar::{CalendarEntry, CalendarTable, NoCalendar};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dates(items: &[&str]) -> BTreeSet<NaiveDate> {
        items.iter().map(|s| d(s)).collect()
    }

    #[test]
    fn specific_dates_dropped_without_replacement() {
        let exclusions = Exclusions {
            specific_dates: dates(&["2025-08-15"]),
            ..Exclusions::none()
        };
        let out = apply_exclusions(
            dates(&["2025-08-14", "2025-08-15", "2025-08-16"]),
            &exclusions,
            &NoCalendar,
        );
        assert_eq!(out, dates(&["2025-08-14", "2025-08-16"]));
    }

    #[test]
    fn weekends_dropped_unless_adjusted_workday() {
        // 2025-08-23 is a Saturday marked as an adjusted workday;
        // 2025-08-24 is a plain Sunday.
        let cal = CalendarTable::from_entries(
            d("2025-01-01"),
            d("2025-12-31"),
            vec![CalendarEntry {
                date: d("2025-08-23"),
                is_holiday: false,
                is_adjusted_workday: true,
            }],
        );
        let exclusions = Exclusions {
            exclude_weekends: true,
            ..Exclusions::none()
        };
        let out = apply_exclusions(
            dates(&["2025-08-22", "2025-08-23", "2025-08-24"]),
            &exclusions,
            &cal,
        );
        assert_eq!(out, dates(&["2025-08-22", "2025-08-23"]));
    }

    #[test]
    fn holidays_dropped_when_known() {
        let cal = CalendarTable::from_entries(
            d("2025-01-01"),
            d("2025-12-31"),
            vec![CalendarEntry {
                date: d("2025-05-01"),
                is_holiday: true,
                is_adjusted_workday: false,
            }],
        );
        let exclusions = Exclusions {
            exclude_holidays: true,
            ..Exclusions::none()
        };
        let out = apply_exclusions(dates(&["2025-05-01", "2025-05-02"]), &exclusions, &cal);
        assert_eq!(out, dates(&["2025-05-02"]));
    }

    #[test]
    fn unknown_holiday_data_degrades_to_noop() {
        let exclusions = Exclusions {
            exclude_holidays: true,
            ..Exclusions::none()
        };
        // No calendar data at all: every date survives holiday exclusion.
        let out = apply_exclusions(dates(&["2025-05-01", "2025-05-02"]), &exclusions, &NoCalendar);
        assert_eq!(out, dates(&["2025-05-01", "2025-05-02"]));
    }

    #[test]
    fn weekend_exclusion_works_without_calendar_data() {
        let exclusions = Exclusions {
            exclude_weekends: true,
            ..Exclusions::none()
        };
        let out = apply_exclusions(
            dates(&["2025-08-22", "2025-08-23", "2025-08-24", "2025-08-25"]),
            &exclusions,
            &NoCalendar,
        );
        assert_eq!(out, dates(&["2025-08-22", "2025-08-25"]));
    }

    #[test]
    fn no_exclusions_keeps_everything() {
        let input = dates(&["2025-08-23", "2025-08-24"]);
        let out = apply_exclusions(input.clone(), &Exclusions::none(), &NoCalendar);
        assert_eq!(out, input);
    }
}
