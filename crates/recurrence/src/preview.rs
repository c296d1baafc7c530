//! Pure occurrence preview: rule + window → ordered `(date, time)` list.

use chrono::{NaiveDate, NaiveTime};

use cadence_calendar::HolidayCalendar;
use cadence_core::rule::ScheduleRule;
use cadence_core::window::DateWindow;

use crate::exclusion::apply_exclusions;
use crate::generator::generate;

/// Expand, filter, and cross with execution times. No persistence is
/// touched; this is the preview surface for the CRUD layer.
///
/// The result is ordered by date then time (dates come from an ordered
/// set, execution times are canonically sorted).
pub fn preview_occurrences(
    rule: &ScheduleRule,
    window: &DateWindow,
    calendar: &dyn HolidayCalendar,
) -> Vec<(NaiveDate, NaiveTime)> {
    let dates = apply_exclusions(generate(rule, window, calendar), &rule.exclusions, calendar);

    let mut out = Vec::with_capacity(dates.len() * rule.execution_times.len());
    for date in dates {
        for &time in &rule.execution_times {
            out.push((date, time));
        }
    }
    out
}
