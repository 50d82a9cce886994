// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Completion-service client for reckon.
//!
//! Wraps a remote completion service behind the [`Provider`] trait, adding
//! sub-batched sampling, rate-limit backoff via a configurable
//! [`RetryPolicy`], and normalization of both the single-prompt and the
//! chat request shapes into a flat list of completion strings.

pub mod client;
pub mod error;
pub mod provider;
pub mod request;
pub mod retry;

pub use client::CompletionClient;
pub use error::CompletionError;
pub use provider::{OpenAiProvider, Provider};
pub use request::{CompletionRequest, Message, Prompt, SamplingParams};
pub use retry::{Backoff, RetryPolicy};
