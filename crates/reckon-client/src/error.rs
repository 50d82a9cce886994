// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Error types for the completion client.

use thiserror::Error;

/// Errors surfaced by the completion client.
///
/// Only [`CompletionError::RateLimited`] is retryable; every other variant
/// is terminal for the request that produced it.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// The service signalled a rate limit (HTTP 429).
    #[error("rate limited by completion service")]
    RateLimited,

    /// Transport-level failure.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the request.
    #[error("completion service returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, best effort.
        message: String,
    },

    /// The service answered but produced no completions.
    #[error("completion service returned no choices")]
    Empty,

    /// The retry budget was spent without collecting enough completions.
    #[error("retry budget exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// Attempts issued before giving up.
        attempts: u32,
    },
}

impl CompletionError {
    /// Whether this error is a rate-limit signal.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}
