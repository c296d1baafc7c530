//! Occurrence generation: canonical rule + window → candidate dates.
//!
//! Pure calendar arithmetic; no exclusion filtering happens here. Candidate
//! dates are returned as a `BTreeSet`, so duplicates are impossible by
//! construction and iteration order is ascending.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, Months, NaiveDate};

use cadence_calendar::{is_workday, HolidayCalendar};
use cadence_core::rule::{
    weekday_number, DayMode, IntervalUnit, OccurrenceOrdinal, RuleMode, ScheduleRule,
};
use cadence_core::window::DateWindow;

/// Expand a rule into candidate dates within `window`.
pub fn generate(
    rule: &ScheduleRule,
    window: &DateWindow,
    calendar: &dyn HolidayCalendar,
) -> BTreeSet<NaiveDate> {
    match &rule.mode {
        RuleMode::ByDay { day_mode } => by_day(&rule.months, day_mode, window, calendar),
        RuleMode::ByWeek {
            weekdays,
            occurrence,
        } => by_week(&rule.months, weekdays, *occurrence, window),
        // Interval rules are month-set-agnostic.
        RuleMode::ByInterval {
            value,
            unit,
            reference_date,
        } => by_interval(*value, *unit, *reference_date, window),
    }
}

/// The final calendar day of a month.
fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .expect("month in 1..=12 within chrono range")
}

/// Every `(year, month)` pair in the window whose month is selected and
/// which overlaps the window at all.
fn selected_months(window: &DateWindow, months: &BTreeSet<u32>) -> Vec<(i32, u32)> {
    let mut out = Vec::new();
    for year in window.from().year()..=window.to().year() {
        for &month in months {
            let first = NaiveDate::from_ymd_opt(year, month, 1).expect("month in 1..=12");
            let last = last_day_of_month(year, month);
            if last < window.from() || first > window.to() {
                continue;
            }
            out.push((year, month));
        }
    }
    out
}

fn by_day(
    months: &BTreeSet<u32>,
    day_mode: &DayMode,
    window: &DateWindow,
    calendar: &dyn HolidayCalendar,
) -> BTreeSet<NaiveDate> {
    let mut out = BTreeSet::new();
    for (year, month) in selected_months(window, months) {
        match day_mode {
            DayMode::SpecificDays { days } => {
                for &day in days {
                    // Days past the end of the month are skipped, never
                    // rolled over into the next month.
                    if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                        if window.contains(date) {
                            out.insert(date);
                        }
                    }
                }
            }
            DayMode::LastDay => {
                let date = last_day_of_month(year, month);
                if window.contains(date) {
                    out.insert(date);
                }
            }
            DayMode::LastWorkday => {
                if let Some(date) = last_workday(year, month, calendar) {
                    if window.contains(date) {
                        out.insert(date);
                    }
                }
            }
            DayMode::NthWorkday { nth } => {
                if let Some(date) = nth_workday(year, month, *nth, calendar) {
                    if window.contains(date) {
                        out.insert(date);
                    }
                }
            }
        }
    }
    out
}

/// Walk backward from the last calendar day until a workday is found.
fn last_workday(year: i32, month: u32, calendar: &dyn HolidayCalendar) -> Option<NaiveDate> {
    let mut date = last_day_of_month(year, month);
    loop {
        if is_workday(calendar, date) {
            return Some(date);
        }
        if date.day() == 1 {
            return None;
        }
        date = date.pred_opt()?;
    }
}

/// Walk forward from day 1 counting workdays; `None` if the month has
/// fewer than `nth` workdays.
fn nth_workday(
    year: i32,
    month: u32,
    nth: u32,
    calendar: &dyn HolidayCalendar,
) -> Option<NaiveDate> {
    let last = last_day_of_month(year, month).day();
    let mut count = 0;
    for day in 1..=last {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        if is_workday(calendar, date) {
            count += 1;
            if count == nth {
                return Some(date);
            }
        }
    }
    None
}

fn by_week(
    months: &BTreeSet<u32>,
    weekdays: &BTreeSet<u32>,
    occurrence: OccurrenceOrdinal,
    window: &DateWindow,
) -> BTreeSet<NaiveDate> {
    let mut out = BTreeSet::new();
    for (year, month) in selected_months(window, months) {
        let last = last_day_of_month(year, month).day();
        let first_weekday =
            weekday_number(NaiveDate::from_ymd_opt(year, month, 1).expect("month in 1..=12"));

        for &wd in weekdays {
            // Day-of-month of the first occurrence of this weekday.
            let first_dom = 1 + (wd + 7 - first_weekday) % 7;
            let occurrences: Vec<u32> = (0..5)
                .map(|k| first_dom + 7 * k)
                .filter(|&dom| dom <= last)
                .collect();

            // Ordinal selection is per weekday within the month: `last`
            // always resolves, a numbered ordinal may not exist and is
            // then skipped for that month.
            let selected: Vec<u32> = match occurrence {
                OccurrenceOrdinal::Every => occurrences,
                OccurrenceOrdinal::Last => occurrences.last().copied().into_iter().collect(),
                ordinal => ordinal
                    .index()
                    .and_then(|i| occurrences.get(i as usize - 1).copied())
                    .into_iter()
                    .collect(),
            };

            for dom in selected {
                let date =
                    NaiveDate::from_ymd_opt(year, month, dom).expect("dom bounded by month length");
                if window.contains(date) {
                    out.insert(date);
                }
            }
        }
    }
    out
}

fn by_interval(
    value: u32,
    unit: IntervalUnit,
    reference: NaiveDate,
    window: &DateWindow,
) -> BTreeSet<NaiveDate> {
    let mut out = BTreeSet::new();
    match unit {
        IntervalUnit::Days | IntervalUnit::Weeks => {
            let step_days = i64::from(value) * if unit == IntervalUnit::Weeks { 7 } else { 1 };
            // Skip ahead arithmetically: the step index just before the
            // window. Anchoring stays at the true origin, so periodicity
            // is preserved across regenerations.
            let mut k: i64 = if reference < window.from() {
                window.from().signed_duration_since(reference).num_days() / step_days
            } else {
                0
            };
            loop {
                let offset = k * step_days;
                let Some(date) = reference.checked_add_days(Days::new(offset as u64)) else {
                    break;
                };
                if date > window.to() {
                    break;
                }
                if date >= window.from() {
                    out.insert(date);
                }
                k += 1;
            }
        }
        IntervalUnit::Months => {
            // Each occurrence is computed from the origin (k * value months
            // from the reference date), so end-of-month clamping never
            // drifts: Jan 31 + 1 month is Feb 28/29, + 2 months is Mar 31.
            let mut k: u32 = 0;
            loop {
                let Some(date) = reference.checked_add_months(Months::new(k * value)) else {
                    break;
                };
                if date > window.to() {
                    break;
                }
                if date >= window.from() {
                    out.insert(date);
                }
                k += 1;
            }
        }
    }
    out
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_calendar::{CalendarEntry, CalendarTable, NoCalendar};
    use cadence_core::rule::{all_months, Exclusions};
    use chrono::NaiveTime;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rule_with(mode: RuleMode) -> ScheduleRule {
        ScheduleRule {
            months: all_months(),
            mode,
            exclusions: Exclusions::none(),
            execution_times: vec![NaiveTime::parse_from_str("09:00", "%H:%M").unwrap()],
        }
    }

    fn window(from: &str, to: &str) -> DateWindow {
        DateWindow::new(d(from), d(to)).unwrap()
    }

    fn holidays(year: &str, dates: &[&str]) -> CalendarTable {
        let from = d(&format!("{year}-01-01"));
        let to = d(&format!("{year}-12-31"));
        CalendarTable::from_entries(
            from,
            to,
            dates
                .iter()
                .map(|s| CalendarEntry {
                    date: d(s),
                    is_holiday: true,
                    is_adjusted_workday: false,
                })
                .collect(),
        )
    }

    // -- by_day --------------------------------------------------------

    #[test]
    fn specific_day_skipped_in_short_months() {
        let mut rule = rule_with(RuleMode::ByDay {
            day_mode: DayMode::SpecificDays {
                days: [31].into_iter().collect(),
            },
        });
        rule.months = [1, 2, 4].into_iter().collect();
        let dates = generate(&rule, &window("2025-01-01", "2025-12-31"), &NoCalendar);
        // Only January has a 31st among the selected months; no roll-over.
        assert_eq!(dates.into_iter().collect::<Vec<_>>(), vec![d("2025-01-31")]);
    }

    #[test]
    fn last_day_handles_leap_february() {
        let mut rule = rule_with(RuleMode::ByDay {
            day_mode: DayMode::LastDay,
        });
        rule.months = [2].into_iter().collect();
        let dates = generate(&rule, &window("2024-01-01", "2025-12-31"), &NoCalendar);
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d("2024-02-29"), d("2025-02-28")]
        );
    }

    #[test]
    fn last_workday_walks_over_weekend_and_holiday() {
        // May 2025 ends on Saturday the 31st; Friday the 30th is a holiday,
        // so the last workday is Thursday the 29th.
        let cal = holidays("2025", &["2025-05-30"]);
        let mut rule = rule_with(RuleMode::ByDay {
            day_mode: DayMode::LastWorkday,
        });
        rule.months = [5].into_iter().collect();
        let dates = generate(&rule, &window("2025-05-01", "2025-05-31"), &cal);
        assert_eq!(dates.into_iter().collect::<Vec<_>>(), vec![d("2025-05-29")]);
    }

    #[test]
    fn first_workday_skips_weekend_start_and_holiday_monday() {
        // June 2024 starts on a Saturday and Monday the 3rd is a holiday:
        // the first workday is Tuesday the 4th.
        let cal = holidays("2024", &["2024-06-03"]);
        let mut rule = rule_with(RuleMode::ByDay {
            day_mode: DayMode::NthWorkday { nth: 1 },
        });
        rule.months = [6].into_iter().collect();
        let dates = generate(&rule, &window("2024-06-01", "2024-06-30"), &cal);
        assert_eq!(dates.into_iter().collect::<Vec<_>>(), vec![d("2024-06-04")]);
    }

    #[test]
    fn nth_workday_exceeding_month_emits_nothing() {
        let mut rule = rule_with(RuleMode::ByDay {
            day_mode: DayMode::NthWorkday { nth: 25 },
        });
        rule.months = [2].into_iter().collect();
        // February 2025 has 20 workdays.
        let dates = generate(&rule, &window("2025-02-01", "2025-02-28"), &NoCalendar);
        assert!(dates.is_empty());
    }

    // -- by_week -------------------------------------------------------

    #[test]
    fn third_friday_in_five_friday_month() {
        // August 2025 has five Fridays: 1, 8, 15, 22, 29.
        let rule = rule_with(RuleMode::ByWeek {
            weekdays: [5].into_iter().collect(),
            occurrence: OccurrenceOrdinal::Third,
        });
        let dates = generate(&rule, &window("2025-08-01", "2025-08-31"), &NoCalendar);
        assert_eq!(dates.into_iter().collect::<Vec<_>>(), vec![d("2025-08-15")]);
    }

    #[test]
    fn last_resolves_with_four_or_five_occurrences() {
        let rule = rule_with(RuleMode::ByWeek {
            weekdays: [5].into_iter().collect(),
            occurrence: OccurrenceOrdinal::Last,
        });
        // August 2025: five Fridays, last is the 29th.
        // September 2025: four Fridays, last is the 26th.
        let dates = generate(&rule, &window("2025-08-01", "2025-09-30"), &NoCalendar);
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d("2025-08-29"), d("2025-09-26")]
        );
    }

    #[test]
    fn every_emits_all_matching_weekdays() {
        let rule = rule_with(RuleMode::ByWeek {
            weekdays: [1].into_iter().collect(),
            occurrence: OccurrenceOrdinal::Every,
        });
        let dates = generate(&rule, &window("2025-08-01", "2025-08-31"), &NoCalendar);
        // Mondays of August 2025.
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d("2025-08-04"), d("2025-08-11"), d("2025-08-18"), d("2025-08-25")]
        );
    }

    #[test]
    fn ordinal_resolved_per_month_then_window_filtered() {
        // The third Friday (Aug 15) is before the window start, so nothing
        // is emitted; the ordinal does not shift to a later Friday.
        let rule = rule_with(RuleMode::ByWeek {
            weekdays: [5].into_iter().collect(),
            occurrence: OccurrenceOrdinal::Third,
        });
        let dates = generate(&rule, &window("2025-08-20", "2025-08-31"), &NoCalendar);
        assert!(dates.is_empty());
    }

    #[test]
    fn multiple_weekdays_group_independently() {
        // First Monday and first Friday of August 2025: the 4th and the 1st.
        let rule = rule_with(RuleMode::ByWeek {
            weekdays: [1, 5].into_iter().collect(),
            occurrence: OccurrenceOrdinal::First,
        });
        let dates = generate(&rule, &window("2025-08-01", "2025-08-31"), &NoCalendar);
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d("2025-08-01"), d("2025-08-04")]
        );
    }

    // -- by_interval ---------------------------------------------------

    #[test]
    fn monthly_interval_clamps_to_month_end() {
        let rule = rule_with(RuleMode::ByInterval {
            value: 1,
            unit: IntervalUnit::Months,
            reference_date: d("2024-01-31"),
        });
        let dates = generate(&rule, &window("2024-01-01", "2024-04-30"), &NoCalendar);
        // Second occurrence is Feb 29 (leap year), never Mar 2; later
        // occurrences return to the 31st/30th because the anchor is the
        // true origin.
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![
                d("2024-01-31"),
                d("2024-02-29"),
                d("2024-03-31"),
                d("2024-04-30")
            ]
        );
    }

    #[test]
    fn interval_anchor_preserved_when_window_starts_late() {
        let rule = rule_with(RuleMode::ByInterval {
            value: 10,
            unit: IntervalUnit::Days,
            reference_date: d("2025-01-01"),
        });
        let dates = generate(&rule, &window("2025-02-01", "2025-03-01"), &NoCalendar);
        // Sequence from the origin: Jan 1, 11, 21, 31, Feb 10, 20, Mar 2.
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d("2025-02-10"), d("2025-02-20")]
        );
    }

    #[test]
    fn weekly_interval_steps_in_weeks() {
        let rule = rule_with(RuleMode::ByInterval {
            value: 2,
            unit: IntervalUnit::Weeks,
            reference_date: d("2025-01-06"),
        });
        let dates = generate(&rule, &window("2025-01-01", "2025-01-31"), &NoCalendar);
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d("2025-01-06"), d("2025-01-20")]
        );
    }

    #[test]
    fn interval_ignores_month_selection() {
        let mut rule = rule_with(RuleMode::ByInterval {
            value: 1,
            unit: IntervalUnit::Months,
            reference_date: d("2025-01-15"),
        });
        rule.months = [1].into_iter().collect();
        let dates = generate(&rule, &window("2025-01-01", "2025-03-31"), &NoCalendar);
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d("2025-01-15"), d("2025-02-15"), d("2025-03-15")]
        );
    }

    #[test]
    fn interval_reference_after_window_is_empty() {
        let rule = rule_with(RuleMode::ByInterval {
            value: 1,
            unit: IntervalUnit::Days,
            reference_date: d("2026-01-01"),
        });
        let dates = generate(&rule, &window("2025-01-01", "2025-12-31"), &NoCalendar);
        assert!(dates.is_empty());
    }

    // -- month selection ----------------------------------------------

    #[test]
    fn month_selection_restricts_day_modes() {
        let mut rule = rule_with(RuleMode::ByDay {
            day_mode: DayMode::SpecificDays {
                days: [15].into_iter().collect(),
            },
        });
        rule.months = [3, 9].into_iter().collect();
        let dates = generate(&rule, &window("2025-01-01", "2025-12-31"), &NoCalendar);
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![d("2025-03-15"), d("2025-09-15")]
        );
    }

    #[test]
    fn last_day_of_month_helper() {
        assert_eq!(last_day_of_month(2024, 2), d("2024-02-29"));
        assert_eq!(last_day_of_month(2025, 2), d("2025-02-28"));
        assert_eq!(last_day_of_month(2025, 12), d("2025-12-31"));
    }
}
