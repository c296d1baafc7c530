//! YAML year-file loader for holiday calendar data.
//!
//! Each file covers one calendar year:
//!
//! ```yaml
//! year: 2025
//! days:
//!   - date: 2025-01-01
//!     is_holiday: true
//!   - date: 2025-01-26
//!     is_adjusted_workday: true
//! ```
//!
//! The loaded horizon for a year file is the full year, so unlisted dates
//! within it are known plain days.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::table::{CalendarEntry, CalendarTable};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("YAML parse error in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("entry {date} in {path} is outside year {year}")]
    OutOfYear {
        path: String,
        date: NaiveDate,
        year: i32,
    },
}

#[derive(Debug, Deserialize)]
struct YearFile {
    year: i32,
    #[serde(default)]
    days: Vec<CalendarEntry>,
}

/// Parse a single year file from a YAML string.
pub fn load_year_str(yaml: &str, path: &str) -> Result<CalendarTable, LoaderError> {
    let file: YearFile = serde_yaml::from_str(yaml).map_err(|source| LoaderError::Parse {
        path: path.to_string(),
        source,
    })?;

    let from = NaiveDate::from_ymd_opt(file.year, 1, 1).expect("valid year start");
    let to = NaiveDate::from_ymd_opt(file.year, 12, 31).expect("valid year end");

    for entry in &file.days {
        if entry.date < from || entry.date > to {
            return Err(LoaderError::OutOfYear {
                path: path.to_string(),
                date: entry.date,
                year: file.year,
            });
        }
    }

    Ok(CalendarTable::from_entries(from, to, file.days))
}

/// Load and merge every `*.yaml`/`*.yml` year file in a directory.
///
/// A missing directory yields an empty table (holiday exclusion then
/// degrades to a no-op); individual unreadable files are skipped with a
/// warning rather than failing the whole load.
pub fn load_dir(dir: impl AsRef<Path>) -> CalendarTable {
    let dir = dir.as_ref();
    let mut table = CalendarTable::empty();

    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "calendar directory unavailable, holiday data empty");
            return table;
        }
    };

    let mut loaded = 0usize;
    for entry in read_dir.flatten() {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);
        if !is_yaml {
            continue;
        }

        let path_str = path.display().to_string();
        match std::fs::read_to_string(&path) {
            Ok(content) => match load_year_str(&content, &path_str) {
                Ok(year_table) => {
                    table.merge(year_table);
                    loaded += 1;
                }
                Err(e) => warn!(path = %path_str, error = %e, "skipping invalid calendar file"),
            },
            Err(e) => warn!(path = %path_str, error = %e, "skipping unreadable calendar file"),
        }
    }

    if let Some((from, to)) = table.horizon() {
        info!(files = loaded, %from, %to, entries = table.len(), "holiday calendar loaded");
    }
    table
}
