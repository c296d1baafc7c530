use thiserror::Error;

use crate::plan::PlanStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CadenceError {
    #[error("invalid plan transition: {from:?} cannot {attempted}")]
    InvalidTransition {
        from: PlanStatus,
        attempted: &'static str,
    },

    #[error("invalid window: from {from} is after to {to}")]
    InvalidWindow {
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    },
}
