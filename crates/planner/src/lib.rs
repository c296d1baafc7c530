//! Plan persistence, materialization, and the scheduling engine facade.
//!
//! The [`PlanStore`] trait carries the claim primitive: the pending →
//! executing transition is a conditional update, so at most one worker
//! across all replicas executes a given plan instant. Two stores are
//! provided: [`MemoryPlanStore`] for tests and embedded use, and
//! [`PgPlanStore`] backed by PostgreSQL.

mod engine;
mod materializer;
mod memory;
mod postgres;
mod store;

pub use engine::SchedulingEngine;
pub use materializer::{MaterializeSummary, Materializer};
pub use memory::MemoryPlanStore;
pub use postgres::{connect_pg, PgPlanStore};
pub use store::{ClaimOutcome, PlanPage, PlanStore, StoreError};
