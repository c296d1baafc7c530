//! Retry policy for failed deliveries.

use chrono::{DateTime, Duration, Utc};

/// Backoff applied before a re-armed plan becomes due again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Re-armed plans are due immediately (next tick).
    Immediate,
    /// Fixed delay before the next attempt.
    Fixed(Duration),
}

/// Decides what happens to a plan after a delivery failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub enabled: bool,
    pub backoff: Backoff,
}

/// What to do with a plan whose delivery just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-arm as pending, due no earlier than the contained instant.
    Rearm(Option<DateTime<Utc>>),
    /// Budget spent (or retries disabled): fail terminally.
    Exhausted,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, enabled: bool, backoff: Backoff) -> Self {
        Self {
            max_retries,
            enabled,
            backoff,
        }
    }

    /// Decide the fate of a plan that failed with `prior_retry_count`
    /// failures already recorded.
    ///
    /// The failure being decided counts against the budget, so a plan
    /// whose failure count reaches `max_retries` is exhausted. With
    /// `max_retries = 3` a plan fails terminally on its third failure.
    pub fn decide(&self, prior_retry_count: u32, now: DateTime<Utc>) -> RetryDecision {
        if !self.enabled {
            return RetryDecision::Exhausted;
        }
        if prior_retry_count + 1 >= self.max_retries {
            return RetryDecision::Exhausted;
        }
        match self.backoff {
            Backoff::Immediate => RetryDecision::Rearm(None),
            Backoff::Fixed(delay) => RetryDecision::Rearm(Some(now + delay)),
        }
    }
}
