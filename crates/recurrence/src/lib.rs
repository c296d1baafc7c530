//! Recurrence-rule compilation and occurrence expansion.
//!
//! The pipeline is pure and synchronous: a raw rule description is
//! [compiled](compiler::compile) into a canonical [`ScheduleRule`], the
//! [generator] expands it into candidate dates within a window, and the
//! [exclusion] filter drops dates per the rule's exclusion policy. No
//! persistence or I/O happens here; the holiday calendar is an injected
//! read-only capability.

pub mod compiler;
pub mod exclusion;
pub mod generator;
pub mod preview;

pub use compiler::{
    compile, compile_json, RawScheduleRule, RuleValidationError, RuleViolation,
};
pub use exclusion::apply_exclusions;
pub use generator::generate;
pub use preview::preview_occurrences;

pub use cadence_core::rule::ScheduleRule;
