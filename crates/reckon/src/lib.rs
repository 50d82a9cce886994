// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! # Reckon - program-aided question answering
//!
//! Turns a natural-language question into a verified answer by prompting a
//! language model for a short program instead of prose, executing that
//! program in a deadline-bounded interpreter sandbox, and resolving the
//! final answer through configurable extraction policies plus majority-vote
//! consensus across samples.
//!
//! ## Pipeline
//!
//! ```text
//! prompt → CompletionClient → N raw texts → Program extraction
//!        → SandboxRuntime (per-program deadline) → ≤N outcomes
//!        → majority_vote → one answer (or None)
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use reckon::{AnswerPolicy, ProgramInterface, RunOptions};
//! use reckon_client::{CompletionClient, OpenAiProvider};
//! use std::sync::Arc;
//!
//! let provider = Arc::new(OpenAiProvider::new(api_key));
//! let client = CompletionClient::new(provider);
//! let mut itf = ProgramInterface::new(client, "gpt-3.5-turbo")
//!     .with_policy(AnswerPolicy::Symbol("answer".into()));
//!
//! let answer = itf.run(&prompt, &RunOptions::default()).await?;
//! ```

#![warn(missing_docs)]

pub mod consensus;
pub mod error;
pub mod extract;
pub mod interface;
pub mod prompts;
pub mod record;
pub mod runtime;

pub use consensus::majority_vote;
pub use error::{Error, Result};
pub use extract::{extract_fenced, Program};
pub use interface::{
    AnswerPolicy, ProgramChatInterface, ProgramInterface, RunOptions, TextInterface,
};
pub use record::{EvalRecord, RecordWriter};
pub use runtime::{ExecError, SandboxRuntime};

// Sandbox values cross the public API (`inject`, `evaluate_expression`).
pub use rhai::Dynamic;
