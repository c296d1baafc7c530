//! Rule compilation: raw recurrence descriptions → canonical [`ScheduleRule`].
//!
//! Compilation is a pure function. It reports **every** violated constraint,
//! not just the first, with JSON-path-like locations (e.g.
//! `"week_mode.weekdays[2]"`). Canonicalization expands an empty month set to
//! all 12 and sorts/deduplicates execution times.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use cadence_core::rule::{
    all_months, DayMode, Exclusions, IntervalUnit, OccurrenceOrdinal, RuleMode, ScheduleRule,
};

// ── Raw input ───────────────────────────────────────────────────────

/// A recurrence description as authored, before validation.
///
/// Everything is optional here; the cross-field invariants (exactly one
/// active sub-mode, matching `rule_type`) are enforced by [`compile`], and
/// the compiled [`ScheduleRule`] makes them unrepresentable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScheduleRule {
    pub rule_type: Option<String>,
    #[serde(default)]
    pub months: Vec<u32>,
    pub day_mode: Option<RawDayMode>,
    pub week_mode: Option<RawWeekMode>,
    pub interval_mode: Option<RawIntervalMode>,
    #[serde(default)]
    pub exclusions: RawExclusions,
    #[serde(default)]
    pub execution_times: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDayMode {
    pub kind: Option<String>,
    #[serde(default)]
    pub days: Vec<u32>,
    pub nth: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWeekMode {
    #[serde(default)]
    pub weekdays: Vec<u32>,
    pub occurrence: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIntervalMode {
    pub value: Option<u32>,
    pub unit: Option<String>,
    pub reference_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExclusions {
    #[serde(default)]
    pub exclude_holidays: bool,
    #[serde(default)]
    pub exclude_weekends: bool,
    #[serde(default)]
    pub specific_dates: Vec<String>,
}

// ── Errors ──────────────────────────────────────────────────────────

/// A single violated constraint with its location in the raw rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleViolation {
    /// JSON-path-like location, e.g. `"interval_mode.reference_date"`.
    pub path: String,
    pub message: String,
}

/// Compilation failure carrying every violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rule validation failed: {} violation(s)", .violations.len())]
pub struct RuleValidationError {
    pub violations: Vec<RuleViolation>,
}

impl RuleValidationError {
    pub fn paths(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.path.as_str()).collect()
    }
}

struct Violations(Vec<RuleViolation>);

impl Violations {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(RuleViolation {
            path: path.into(),
            message: message.into(),
        });
    }

    fn into_result(self, rule: Option<ScheduleRule>) -> Result<ScheduleRule, RuleValidationError> {
        if self.0.is_empty() {
            // All pieces validated, so the assembled rule must exist.
            Ok(rule.expect("canonical rule assembled without violations"))
        } else {
            Err(RuleValidationError { violations: self.0 })
        }
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Compile and canonicalize a raw rule description.
pub fn compile(raw: &RawScheduleRule) -> Result<ScheduleRule, RuleValidationError> {
    let mut v = Violations::new();

    let months = compile_months(&raw.months, &mut v);
    let mode = compile_mode(raw, &mut v);
    let exclusions = compile_exclusions(&raw.exclusions, &mut v);
    let execution_times = compile_times(&raw.execution_times, &mut v);

    let rule = match (mode, exclusions, execution_times) {
        (Some(mode), Some(exclusions), Some(execution_times)) => Some(ScheduleRule {
            months,
            mode,
            exclusions,
            execution_times,
        }),
        _ => None,
    };

    v.into_result(rule)
}

/// Parse a raw rule from JSON and compile it. A parse failure is reported
/// as a single violation at the document root.
pub fn compile_json(json: &str) -> Result<ScheduleRule, RuleValidationError> {
    match serde_json::from_str::<RawScheduleRule>(json) {
        Ok(raw) => compile(&raw),
        Err(e) => Err(RuleValidationError {
            violations: vec![RuleViolation {
                path: String::new(),
                message: format!("JSON parse error: {e}"),
            }],
        }),
    }
}

// ── Pieces ──────────────────────────────────────────────────────────

fn compile_months(raw: &[u32], v: &mut Violations) -> BTreeSet<u32> {
    if raw.is_empty() {
        return all_months();
    }
    let mut months = BTreeSet::new();
    for (i, &m) in raw.iter().enumerate() {
        if (1..=12).contains(&m) {
            months.insert(m);
        } else {
            v.push(format!("months[{i}]"), format!("month must be 1–12, got {m}"));
        }
    }
    months
}

fn compile_mode(raw: &RawScheduleRule, v: &mut Violations) -> Option<RuleMode> {
    let rule_type = match raw.rule_type.as_deref() {
        Some(t @ ("by_day" | "by_week" | "by_interval")) => t,
        Some(other) => {
            v.push(
                "rule_type",
                format!("rule_type must be one of by_day, by_week, by_interval, got '{other}'"),
            );
            return None;
        }
        None => {
            v.push("rule_type", "rule_type is required");
            return None;
        }
    };

    // Exactly one sub-mode, matching the rule type.
    if rule_type != "by_day" && raw.day_mode.is_some() {
        v.push("day_mode", format!("day_mode must not be set when rule_type is {rule_type}"));
    }
    if rule_type != "by_week" && raw.week_mode.is_some() {
        v.push("week_mode", format!("week_mode must not be set when rule_type is {rule_type}"));
    }
    if rule_type != "by_interval" && raw.interval_mode.is_some() {
        v.push(
            "interval_mode",
            format!("interval_mode must not be set when rule_type is {rule_type}"),
        );
    }

    match rule_type {
        "by_day" => match &raw.day_mode {
            Some(dm) => compile_day_mode(dm, v).map(|day_mode| RuleMode::ByDay { day_mode }),
            None => {
                v.push("day_mode", "day_mode is required when rule_type is by_day");
                None
            }
        },
        "by_week" => match &raw.week_mode {
            Some(wm) => compile_week_mode(wm, v),
            None => {
                v.push("week_mode", "week_mode is required when rule_type is by_week");
                None
            }
        },
        "by_interval" => match &raw.interval_mode {
            Some(im) => compile_interval_mode(im, v),
            None => {
                v.push(
                    "interval_mode",
                    "interval_mode is required when rule_type is by_interval",
                );
                None
            }
        },
        _ => unreachable!("rule_type already narrowed"),
    }
}

fn compile_day_mode(raw: &RawDayMode, v: &mut Violations) -> Option<DayMode> {
    match raw.kind.as_deref() {
        Some("specific_days") => {
            let mut days = BTreeSet::new();
            for (i, &d) in raw.days.iter().enumerate() {
                if (1..=31).contains(&d) {
                    days.insert(d);
                } else {
                    v.push(
                        format!("day_mode.days[{i}]"),
                        format!("day must be 1–31, got {d}"),
                    );
                }
            }
            if raw.days.is_empty() {
                v.push("day_mode.days", "specific_days requires at least one day");
                return None;
            }
            Some(DayMode::SpecificDays { days })
        }
        Some("last_day") => Some(DayMode::LastDay),
        Some("last_workday") => Some(DayMode::LastWorkday),
        Some("nth_workday") => match raw.nth {
            Some(nth) if nth >= 1 => Some(DayMode::NthWorkday { nth }),
            Some(nth) => {
                v.push("day_mode.nth", format!("nth must be >= 1, got {nth}"));
                None
            }
            None => {
                v.push("day_mode.nth", "nth_workday requires 'nth'");
                None
            }
        },
        Some(other) => {
            v.push(
                "day_mode.kind",
                format!(
                    "kind must be one of specific_days, last_day, last_workday, nth_workday, got '{other}'"
                ),
            );
            None
        }
        None => {
            v.push("day_mode.kind", "day_mode.kind is required");
            None
        }
    }
}

fn compile_week_mode(raw: &RawWeekMode, v: &mut Violations) -> Option<RuleMode> {
    let mut weekdays = BTreeSet::new();
    for (i, &wd) in raw.weekdays.iter().enumerate() {
        if (1..=7).contains(&wd) {
            weekdays.insert(wd);
        } else {
            v.push(
                format!("week_mode.weekdays[{i}]"),
                format!("weekday must be 1 (Monday) – 7 (Sunday), got {wd}"),
            );
        }
    }
    if raw.weekdays.is_empty() {
        v.push("week_mode.weekdays", "at least one weekday is required");
    }

    let occurrence = match raw.occurrence.as_deref() {
        Some("every") => Some(OccurrenceOrdinal::Every),
        Some("first") => Some(OccurrenceOrdinal::First),
        Some("second") => Some(OccurrenceOrdinal::Second),
        Some("third") => Some(OccurrenceOrdinal::Third),
        Some("fourth") => Some(OccurrenceOrdinal::Fourth),
        Some("last") => Some(OccurrenceOrdinal::Last),
        Some(other) => {
            v.push(
                "week_mode.occurrence",
                format!(
                    "occurrence must be one of every, first, second, third, fourth, last, got '{other}'"
                ),
            );
            None
        }
        None => {
            v.push("week_mode.occurrence", "occurrence is required");
            None
        }
    };

    match (weekdays.is_empty(), occurrence) {
        (false, Some(occurrence)) => Some(RuleMode::ByWeek {
            weekdays,
            occurrence,
        }),
        _ => None,
    }
}

fn compile_interval_mode(raw: &RawIntervalMode, v: &mut Violations) -> Option<RuleMode> {
    let value = match raw.value {
        Some(value) if value >= 1 => Some(value),
        Some(value) => {
            v.push("interval_mode.value", format!("value must be >= 1, got {value}"));
            None
        }
        None => {
            v.push("interval_mode.value", "value is required");
            None
        }
    };

    let unit = match raw.unit.as_deref() {
        Some("days") => Some(IntervalUnit::Days),
        Some("weeks") => Some(IntervalUnit::Weeks),
        Some("months") => Some(IntervalUnit::Months),
        Some(other) => {
            v.push(
                "interval_mode.unit",
                format!("unit must be one of days, weeks, months, got '{other}'"),
            );
            None
        }
        None => {
            v.push("interval_mode.unit", "unit is required");
            None
        }
    };

    let reference_date = match raw.reference_date.as_deref() {
        Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                v.push(
                    "interval_mode.reference_date",
                    format!("reference_date must be YYYY-MM-DD, got '{s}'"),
                );
                None
            }
        },
        None => {
            v.push("interval_mode.reference_date", "reference_date is required");
            None
        }
    };

    match (value, unit, reference_date) {
        (Some(value), Some(unit), Some(reference_date)) => Some(RuleMode::ByInterval {
            value,
            unit,
            reference_date,
        }),
        _ => None,
    }
}

fn compile_exclusions(raw: &RawExclusions, v: &mut Violations) -> Option<Exclusions> {
    let mut specific_dates = BTreeSet::new();
    let mut ok = true;
    for (i, s) in raw.specific_dates.iter().enumerate() {
        match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(date) => {
                specific_dates.insert(date);
            }
            Err(_) => {
                v.push(
                    format!("exclusions.specific_dates[{i}]"),
                    format!("date must be YYYY-MM-DD, got '{s}'"),
                );
                ok = false;
            }
        }
    }
    ok.then_some(Exclusions {
        exclude_holidays: raw.exclude_holidays,
        exclude_weekends: raw.exclude_weekends,
        specific_dates,
    })
}

fn compile_times(raw: &[String], v: &mut Violations) -> Option<Vec<NaiveTime>> {
    if raw.is_empty() {
        v.push("execution_times", "at least one execution time is required");
        return None;
    }

    let mut times = Vec::with_capacity(raw.len());
    let mut ok = true;
    for (i, s) in raw.iter().enumerate() {
        match NaiveTime::parse_from_str(s, "%H:%M") {
            Ok(time) => times.push(time),
            Err(_) => {
                v.push(
                    format!("execution_times[{i}]"),
                    format!("time must be HH:MM, got '{s}'"),
                );
                ok = false;
            }
        }
    }

    times.sort_unstable();
    times.dedup();
    ok.then_some(times)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_raw() -> RawScheduleRule {
        RawScheduleRule {
            rule_type: Some("by_day".to_string()),
            months: vec![],
            day_mode: Some(RawDayMode {
                kind: Some("specific_days".to_string()),
                days: vec![15],
                nth: None,
            }),
            week_mode: None,
            interval_mode: None,
            exclusions: RawExclusions::default(),
            execution_times: vec!["09:00".to_string()],
        }
    }

    #[test]
    fn valid_rule_compiles() {
        let rule = compile(&valid_raw()).unwrap();
        assert_eq!(rule.months.len(), 12, "empty months expands to all");
        assert!(matches!(
            rule.mode,
            RuleMode::ByDay {
                day_mode: DayMode::SpecificDays { ref days }
            } if days.contains(&15)
        ));
    }

    #[test]
    fn collects_every_violation_not_just_first() {
        let raw = RawScheduleRule {
            rule_type: Some("by_week".to_string()),
            months: vec![0, 13],
            week_mode: Some(RawWeekMode {
                weekdays: vec![8],
                occurrence: Some("fifth".to_string()),
            }),
            execution_times: vec!["25:99".to_string()],
            ..Default::default()
        };
        let err = compile(&raw).unwrap_err();
        let paths = err.paths();
        assert!(paths.contains(&"months[0]"));
        assert!(paths.contains(&"months[1]"));
        assert!(paths.contains(&"week_mode.weekdays[0]"));
        assert!(paths.contains(&"week_mode.occurrence"));
        assert!(paths.contains(&"execution_times[0]"));
        assert!(err.violations.len() >= 5);
    }

    #[test]
    fn execution_times_sorted_and_deduplicated() {
        let mut raw = valid_raw();
        raw.execution_times = vec![
            "18:00".to_string(),
            "09:00".to_string(),
            "09:00".to_string(),
        ];
        let rule = compile(&raw).unwrap();
        assert_eq!(
            rule.execution_times,
            vec![
                NaiveTime::parse_from_str("09:00", "%H:%M").unwrap(),
                NaiveTime::parse_from_str("18:00", "%H:%M").unwrap(),
            ]
        );
    }

    #[test]
    fn empty_execution_times_rejected() {
        let mut raw = valid_raw();
        raw.execution_times.clear();
        let err = compile(&raw).unwrap_err();
        assert!(err.paths().contains(&"execution_times"));
    }

    #[test]
    fn inactive_sub_mode_rejected() {
        let mut raw = valid_raw();
        raw.week_mode = Some(RawWeekMode {
            weekdays: vec![1],
            occurrence: Some("every".to_string()),
        });
        let err = compile(&raw).unwrap_err();
        assert!(err.paths().contains(&"week_mode"));
    }

    #[test]
    fn missing_active_sub_mode_rejected() {
        let mut raw = valid_raw();
        raw.day_mode = None;
        let err = compile(&raw).unwrap_err();
        assert!(err.paths().contains(&"day_mode"));
    }

    #[test]
    fn unknown_rule_type_rejected() {
        let mut raw = valid_raw();
        raw.rule_type = Some("by_moon_phase".to_string());
        let err = compile(&raw).unwrap_err();
        assert!(err.paths().contains(&"rule_type"));
    }

    #[test]
    fn interval_mode_requires_all_fields() {
        let raw = RawScheduleRule {
            rule_type: Some("by_interval".to_string()),
            interval_mode: Some(RawIntervalMode {
                value: Some(0),
                unit: Some("fortnights".to_string()),
                reference_date: Some("31-01-2024".to_string()),
            }),
            execution_times: vec!["08:30".to_string()],
            ..Default::default()
        };
        let err = compile(&raw).unwrap_err();
        let paths = err.paths();
        assert!(paths.contains(&"interval_mode.value"));
        assert!(paths.contains(&"interval_mode.unit"));
        assert!(paths.contains(&"interval_mode.reference_date"));
    }

    #[test]
    fn interval_rule_compiles() {
        let raw = RawScheduleRule {
            rule_type: Some("by_interval".to_string()),
            interval_mode: Some(RawIntervalMode {
                value: Some(10),
                unit: Some("days".to_string()),
                reference_date: Some("2024-01-31".to_string()),
            }),
            execution_times: vec!["08:30".to_string()],
            ..Default::default()
        };
        let rule = compile(&raw).unwrap();
        assert!(matches!(
            rule.mode,
            RuleMode::ByInterval {
                value: 10,
                unit: IntervalUnit::Days,
                ..
            }
        ));
    }

    #[test]
    fn exclusion_dates_parsed() {
        let mut raw = valid_raw();
        raw.exclusions.specific_dates = vec!["2025-12-25".to_string()];
        raw.exclusions.exclude_weekends = true;
        let rule = compile(&raw).unwrap();
        assert!(rule.exclusions.exclude_weekends);
        assert!(rule
            .exclusions
            .specific_dates
            .contains(&NaiveDate::parse_from_str("2025-12-25", "%Y-%m-%d").unwrap()));
    }

    #[test]
    fn compile_json_reports_parse_error() {
        let err = compile_json("{not json").unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(err.violations[0].message.contains("JSON parse error"));
    }

    #[test]
    fn compile_json_end_to_end() {
        let rule = compile_json(
            r#"{
                "rule_type": "by_week",
                "months": [6, 7, 8],
                "week_mode": { "weekdays": [5], "occurrence": "third" },
                "execution_times": ["09:00", "18:00"]
            }"#,
        )
        .unwrap();
        assert_eq!(rule.months, [6, 7, 8].into_iter().collect());
        assert!(matches!(
            rule.mode,
            RuleMode::ByWeek {
                occurrence: OccurrenceOrdinal::Third,
                ..
            }
        ));
    }

    #[test]
    fn nth_workday_requires_positive_nth() {
        let raw = RawScheduleRule {
            rule_type: Some("by_day".to_string()),
            day_mode: Some(RawDayMode {
                kind: Some("nth_workday".to_string()),
                days: vec![],
                nth: Some(0),
            }),
            execution_times: vec!["09:00".to_string()],
            ..Default::default()
        };
        let err = compile(&raw).unwrap_err();
        assert!(err.paths().contains(&"day_mode.nth"));
    }
}
