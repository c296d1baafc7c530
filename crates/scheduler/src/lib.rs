//! The delivery loop: ticks over due plans, claims them, and hands the
//! rendered reminders to a notifier under a retry policy.

pub mod policy;
pub mod runner;
pub mod source;

pub use policy::{Backoff, RetryDecision, RetryPolicy};
pub use runner::{LoopOptions, SchedulerLoop, TickSummary};
pub use source::{
    FileTaskDirectory, MessageBuilder, SourceError, StaticTaskDirectory, TaskDirectory, TaskInfo,
};
