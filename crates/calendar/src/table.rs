//! In-memory calendar table over a bounded horizon.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{DayKnowledge, DayMarks, HolidayCalendar};

/// One loaded calendar date with its markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub is_holiday: bool,
    #[serde(default)]
    pub is_adjusted_workday: bool,
}

/// Lookup table mapping dates to [`DayMarks`] within a loaded horizon.
///
/// Dates inside the horizon with no explicit entry are plain days (not a
/// holiday, not adjusted); dates outside the horizon are `Unknown`.
#[derive(Debug, Clone, Default)]
pub struct CalendarTable {
    entries: BTreeMap<NaiveDate, DayMarks>,
    horizon: Option<(NaiveDate, NaiveDate)>,
}

impl CalendarTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table covering `[horizon_from, horizon_to]` from explicit
    /// entries. Entries outside the horizon extend it.
    pub fn from_entries(
        horizon_from: NaiveDate,
        horizon_to: NaiveDate,
        entries: Vec<CalendarEntry>,
    ) -> Self {
        let mut table = Self {
            entries: BTreeMap::new(),
            horizon: Some((horizon_from.min(horizon_to), horizon_to.max(horizon_from))),
        };
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    /// Insert or overwrite a single entry, widening the horizon if needed.
    pub fn insert(&mut self, entry: CalendarEntry) {
        self.horizon = Some(match self.horizon {
            Some((from, to)) => (from.min(entry.date), to.max(entry.date)),
            None => (entry.date, entry.date),
        });
        self.entries.insert(
            entry.date,
            DayMarks {
                is_holiday: entry.is_holiday,
                is_adjusted_workday: entry.is_adjusted_workday,
            },
        );
    }

    /// Merge another table into this one (e.g., additional loaded years).
    pub fn merge(&mut self, other: CalendarTable) {
        if let Some((from, to)) = other.horizon {
            self.horizon = Some(match self.horizon {
                Some((a, b)) => (a.min(from), b.max(to)),
                None => (from, to),
            });
        }
        self.entries.extend(other.entries);
    }

    /// The loaded horizon, if any data is present.
    pub fn horizon(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.horizon
    }

    /// Number of explicit entries (not the horizon width).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HolidayCalendar for CalendarTable {
    fn lookup(&self, date: NaiveDate) -> DayKnowledge {
        match self.horizon {
            Some((from, to)) if date >= from && date <= to => {
                DayKnowledge::Known(self.entries.get(&date).copied().unwrap_or_default())
            }
            _ => DayKnowledge::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn lookup_inside_horizon_defaults_to_plain_day() {
        let table = CalendarTable::from_entries(d("2025-01-01"), d("2025-12-31"), vec![]);
        assert_eq!(
            table.lookup(d("2025-06-15")),
            DayKnowledge::Known(DayMarks::default())
        );
    }

    #[test]
    fn lookup_outside_horizon_is_unknown() {
        let table = CalendarTable::from_entries(d("2025-01-01"), d("2025-12-31"), vec![]);
        assert_eq!(table.lookup(d("2026-01-01")), DayKnowledge::Unknown);
        assert_eq!(table.lookup(d("2024-12-31")), DayKnowledge::Unknown);
    }

    #[test]
    fn merge_widens_horizon() {
        let mut a = CalendarTable::from_entries(
            d("2025-01-01"),
            d("2025-12-31"),
            vec![CalendarEntry {
                date: d("2025-05-01"),
                is_holiday: true,
                is_adjusted_workday: false,
            }],
        );
        let b = CalendarTable::from_entries(
            d("2026-01-01"),
            d("2026-12-31"),
            vec![CalendarEntry {
                date: d("2026-01-01"),
                is_holiday: true,
                is_adjusted_workday: false,
            }],
        );
        a.merge(b);
        assert_eq!(a.horizon(), Some((d("2025-01-01"), d("2026-12-31"))));
        assert!(matches!(
            a.lookup(d("2026-01-01")),
            DayKnowledge::Known(m) if m.is_holiday
        ));
        assert!(matches!(
            a.lookup(d("2025-05-01")),
            DayKnowledge::Known(m) if m.is_holiday
        ));
    }

    #[test]
    fn empty_table_is_unknown() {
        let table = CalendarTable::empty();
        assert_eq!(table.lookup(d("2025-01-01")), DayKnowledge::Unknown);
    }
}
