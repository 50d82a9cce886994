// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Sub-batched completion client.
//!
//! One logical request for N samples is issued as sub-batches of at most
//! [`BATCH_LIMIT`] completions, concatenated in issuance order. The service
//! may under-deliver per sub-batch; the client tops up until exactly N
//! completions are collected or the retry budget is spent.

use crate::error::CompletionError;
use crate::provider::Provider;
use crate::request::{CompletionRequest, Prompt, SamplingParams};
use crate::retry::RetryPolicy;
use std::sync::Arc;

/// Per-call sampling limit of the remote service.
pub const BATCH_LIMIT: usize = 5;

/// Client wrapping a [`Provider`] with batching and backoff.
pub struct CompletionClient {
    provider: Arc<dyn Provider>,
    policy: RetryPolicy,
    batch_limit: usize,
}

impl CompletionClient {
    /// Create a client with the default retry policy and batch limit.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            policy: RetryPolicy::default(),
            batch_limit: BATCH_LIMIT,
        }
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the per-call sampling limit.
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit.max(1);
        self
    }

    /// Collect exactly `sample_count` completions for one prompt.
    ///
    /// Returns a vector of length `sample_count`, or an error — never a
    /// short vector. Rate-limit signals are retried with the policy's
    /// backoff; the attempt budget scales with the number of sub-batches
    /// (`max_attempts × ⌈sample_count / batch_limit⌉`).
    pub async fn complete(
        &self,
        prompt: &Prompt,
        params: &SamplingParams,
        sample_count: usize,
    ) -> Result<Vec<String>, CompletionError> {
        let sample_count = sample_count.max(1);
        let batches = sample_count.div_ceil(self.batch_limit) as u32;
        let budget = self.policy.max_attempts.saturating_mul(batches);

        let mut texts: Vec<String> = Vec::with_capacity(sample_count);
        let mut attempts = 0u32;
        let mut retry = 0u32;

        while texts.len() < sample_count {
            if attempts >= budget {
                return Err(CompletionError::RetriesExhausted { attempts });
            }
            attempts += 1;

            let want = (sample_count - texts.len()).min(self.batch_limit);
            let req = CompletionRequest {
                prompt: prompt.clone(),
                params: params.clone(),
                n: want as u32,
            };

            match self.provider.complete(&req).await {
                Ok(batch) => {
                    retry = 0;
                    texts.extend(batch);
                }
                Err(err) if self.policy.is_retryable(&err) => {
                    let delay = self.policy.delay(retry);
                    retry += 1;
                    tracing::debug!(
                        provider = self.provider.name(),
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }

        // The service may over-deliver on the final sub-batch.
        texts.truncate(sample_count);
        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Provider that replays a script of canned call results.
    struct Scripted {
        calls: Mutex<VecDeque<Result<Vec<String>, CompletionError>>>,
        seen_n: Mutex<Vec<u32>>,
    }

    impl Scripted {
        fn new(calls: Vec<Result<Vec<String>, CompletionError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(calls.into()),
                seen_n: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        async fn complete(
            &self,
            req: &CompletionRequest,
        ) -> Result<Vec<String>, CompletionError> {
            self.seen_n.lock().unwrap().push(req.n);
            self.calls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CompletionError::Empty))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn completions(texts: &[&str]) -> Result<Vec<String>, CompletionError> {
        Ok(texts.iter().map(|t| t.to_string()).collect())
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            ..RetryPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_sub_batches_concatenate_in_order() {
        let provider = Scripted::new(vec![
            completions(&["a", "b", "c", "d", "e"]),
            completions(&["f", "g"]),
        ]);
        let client = CompletionClient::new(provider.clone());

        let texts = client
            .complete(&Prompt::text("q"), &SamplingParams::default(), 7)
            .await
            .unwrap();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(*provider.seen_n.lock().unwrap(), vec![5, 2]);
    }

    #[tokio::test]
    async fn test_tops_up_after_under_delivery() {
        let provider = Scripted::new(vec![
            completions(&["a", "b"]),
            completions(&["c"]),
            completions(&["d"]),
        ]);
        let client = CompletionClient::new(provider);

        let texts = client
            .complete(&Prompt::text("q"), &SamplingParams::default(), 4)
            .await
            .unwrap();
        assert_eq!(texts.len(), 4);
    }

    #[tokio::test]
    async fn test_over_delivery_is_truncated() {
        let provider = Scripted::new(vec![completions(&["a", "b", "c"])]);
        let client = CompletionClient::new(provider);

        let texts = client
            .complete(&Prompt::text("q"), &SamplingParams::default(), 2)
            .await
            .unwrap();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_succeeds() {
        let provider = Scripted::new(vec![
            Err(CompletionError::RateLimited),
            Err(CompletionError::RateLimited),
            completions(&["a"]),
        ]);
        let client = CompletionClient::new(provider).with_policy(fast_policy());

        let texts = client
            .complete(&Prompt::text("q"), &SamplingParams::default(), 1)
            .await
            .unwrap();
        assert_eq!(texts, vec!["a"]);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_is_fatal() {
        let provider = Scripted::new(vec![
            Err(CompletionError::RateLimited),
            Err(CompletionError::RateLimited),
            Err(CompletionError::RateLimited),
        ]);
        let client = CompletionClient::new(provider).with_policy(fast_policy());

        let err = client
            .complete(&Prompt::text("q"), &SamplingParams::default(), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompletionError::RetriesExhausted { attempts: 3 }
        ));
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates() {
        let provider = Scripted::new(vec![Err(CompletionError::Api {
            status: 400,
            message: "bad model".into(),
        })]);
        let client = CompletionClient::new(provider).with_policy(fast_policy());

        let err = client
            .complete(&Prompt::text("q"), &SamplingParams::default(), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Api { status: 400, .. }));
    }
}
