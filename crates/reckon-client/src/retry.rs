// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Retry policy for rate-limited completion calls.
//!
//! Expresses the backoff behavior as a policy object (max attempts, backoff
//! shape, retryable-error predicate) so the client loop stays testable
//! independent of the network.

use crate::error::CompletionError;
use std::time::Duration;

/// Shape of the delay sequence between retries.
#[derive(Debug, Clone)]
pub enum Backoff {
    /// Multiply the delay by `factor` after every retry.
    Exponential {
        /// Growth factor per retry.
        factor: f64,
    },
    /// Grow the delay by a fixed `step` per retry.
    Linear {
        /// Increment per retry.
        step: Duration,
    },
}

/// Retry behavior for one sub-batch of completions.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempt budget per sub-batch of the overall request.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// How the delay grows across consecutive retries.
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff: Backoff::Exponential { factor: 2.0 },
        }
    }
}

impl RetryPolicy {
    /// Exponential policy doubling from one second, capped at sixty.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Linear policy growing by `step` per retry.
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: step,
            max_delay: Duration::from_secs(60),
            backoff: Backoff::Linear { step },
        }
    }

    /// Delay before the retry with the given zero-based index.
    pub fn delay(&self, retry: u32) -> Duration {
        let raw = match self.backoff {
            Backoff::Exponential { factor } => Duration::from_secs_f64(
                self.initial_delay.as_secs_f64() * factor.powi(retry as i32),
            ),
            Backoff::Linear { step } => self.initial_delay + step * retry,
        };
        raw.min(self.max_delay)
    }

    /// Whether the error warrants another attempt.
    pub fn is_retryable(&self, error: &CompletionError) -> bool {
        error.is_rate_limit()
    }
}
