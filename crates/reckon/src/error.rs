// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Error types for the reckon pipeline.
//!
//! Failures below the aggregator are recovered locally and downgrade single
//! programs to "no outcome"; only transport failures cross the pipeline API
//! boundary as hard errors. Execution errors appear here only for callers
//! that execute a single program directly (the chat-variant interface).

use crate::runtime::ExecError;
use thiserror::Error;

/// Result type alias for reckon operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline-level error.
#[derive(Error, Debug)]
pub enum Error {
    /// The completion service was unreachable or stayed rate-limited past
    /// the retry budget. Fatal for the whole request.
    #[error("completion transport failed: {0}")]
    Transport(#[from] reckon_client::CompletionError),

    /// A single program failed in the sandbox. Surfaced only from call
    /// sites that execute exactly one program.
    #[error("program execution failed: {0}")]
    Execution(#[from] ExecError),
}
