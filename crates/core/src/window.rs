//! Closed date windows used for generation, materialization, and listing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CadenceError;

/// A closed civil-date interval `[from, to]`.
///
/// Construction enforces `from <= to`, so downstream code never has to
/// re-check window validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, CadenceError> {
        if from > to {
            return Err(CadenceError::InvalidWindow { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}
