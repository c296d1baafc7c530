//! Canonical recurrence rule model.
//!
//! A [`ScheduleRule`] is the compiled, validated form of a user-authored
//! recurrence description. Exactly one scheduling mode is active, enforced
//! by the [`RuleMode`] tagged union rather than by optional cross-dependent
//! fields. Rules are immutable once compiled; edits replace them wholesale.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// A compiled, canonical recurrence rule owned by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRule {
    /// Selected months (1–12). Canonical form is always fully populated:
    /// "all months" is stored as the full set, never as empty.
    pub months: BTreeSet<u32>,
    /// The single active scheduling mode.
    pub mode: RuleMode,
    /// Exclusion policy applied after occurrence generation.
    pub exclusions: Exclusions,
    /// Times of day to fire on each occurrence date. Sorted ascending,
    /// deduplicated, never empty.
    pub execution_times: Vec<NaiveTime>,
}

/// The active scheduling mode of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleMode {
    /// Day-of-month driven scheduling.
    ByDay { day_mode: DayMode },
    /// Weekday/ordinal driven scheduling. Weekdays are Monday=1 .. Sunday=7.
    ByWeek {
        weekdays: BTreeSet<u32>,
        occurrence: OccurrenceOrdinal,
    },
    /// Fixed-interval scheduling anchored at a reference date.
    /// Interval rules ignore the month set entirely.
    ByInterval {
        value: u32,
        unit: IntervalUnit,
        reference_date: NaiveDate,
    },
}

/// Sub-mode of [`RuleMode::ByDay`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayMode {
    /// Specific days of the month (1–31). Days that do not exist in a
    /// given month are silently skipped, never rolled over.
    SpecificDays { days: BTreeSet<u32> },
    /// The final calendar day of each selected month.
    LastDay,
    /// The last workday of each selected month.
    LastWorkday,
    /// The nth workday (1-based) of each selected month.
    NthWorkday { nth: u32 },
}

/// Which occurrence of a weekday within the month to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceOrdinal {
    Every,
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl OccurrenceOrdinal {
    /// 1-based ordinal index, or `None` for `Every`/`Last`.
    pub fn index(&self) -> Option<u32> {
        match self {
            OccurrenceOrdinal::First => Some(1),
            OccurrenceOrdinal::Second => Some(2),
            OccurrenceOrdinal::Third => Some(3),
            OccurrenceOrdinal::Fourth => Some(4),
            OccurrenceOrdinal::Every | OccurrenceOrdinal::Last => None,
        }
    }
}

/// Unit of a [`RuleMode::ByInterval`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
}

/// Exclusion policy: dates removed after occurrence generation.
/// Exclusion only drops dates; it never produces make-up dates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    #[serde(default)]
    pub exclude_holidays: bool,
    #[serde(default)]
    pub exclude_weekends: bool,
    #[serde(default)]
    pub specific_dates: BTreeSet<NaiveDate>,
}

impl Exclusions {
    pub fn none() -> Self {
        Self::default()
    }
}

/// The full month set 1–12, used when a raw rule leaves months empty.
pub fn all_months() -> BTreeSet<u32> {
    (1..=12).collect()
}

/// Map a weekday number (Monday=1 .. Sunday=7) to [`chrono::Weekday`].
pub fn weekday_from_number(n: u32) -> Option<Weekday> {
    match n {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Weekday number (Monday=1 .. Sunday=7) of a date.
pub fn weekday_number(date: NaiveDate) -> u32 {
    use chrono::Datelike;
    date.weekday().number_from_monday()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn weekday_numbering_is_monday_based() {
        // 2025-08-18 is a Monday.
        assert_eq!(weekday_number(d("2025-08-18")), 1);
        assert_eq!(weekday_number(d("2025-08-24")), 7);
    }

    #[test]
    fn all_months_is_full() {
        let m = all_months();
        assert_eq!(m.len(), 12);
        assert!(m.contains(&1) && m.contains(&12));
    }

    #[test]
    fn rule_mode_round_trips_through_json() {
        let mode = RuleMode::ByWeek {
            weekdays: [1, 5].into_iter().collect(),
            occurrence: OccurrenceOrdinal::Third,
        };
        let json = serde_json::to_string(&mode).unwrap();
        assert!(json.contains("\"rule_type\":\"by_week\""));
        let back: RuleMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mode);
    }

    #[test]
    fn ordinal_index() {
        assert_eq!(OccurrenceOrdinal::Third.index(), Some(3));
        assert_eq!(OccurrenceOrdinal::Every.index(), None);
        assert_eq!(OccurrenceOrdinal::Last.index(), None);
    }
}
