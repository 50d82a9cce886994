// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Provider abstraction over the remote completion service.
//!
//! A provider turns one [`CompletionRequest`] into up to `n` completion
//! strings. It may deliver fewer than requested per call; topping up is the
//! client's job, not the provider's.

use crate::error::CompletionError;
use crate::request::{CompletionRequest, Message, Prompt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One call against the completion service.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Request up to `req.n` completions, normalized to a flat list of
    /// strings regardless of the request shape.
    async fn complete(&self, req: &CompletionRequest) -> Result<Vec<String>, CompletionError>;

    /// Human-readable provider name, for diagnostics.
    fn name(&self) -> &str;
}

/// OpenAI-compatible HTTP provider.
///
/// Maps [`Prompt::Text`] to `/v1/completions` and [`Prompt::Chat`] to
/// `/v1/chat/completions`; any endpoint speaking the same wire format works
/// through `with_base_url`.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a provider against the default OpenAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the provider at a compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn no_stop(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Serialize)]
struct TextWireRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    n: u32,
    #[serde(skip_serializing_if = "no_stop")]
    stop: &'a [String],
}

#[derive(Serialize)]
struct ChatWireRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    n: u32,
    #[serde(skip_serializing_if = "no_stop")]
    stop: &'a [String],
}

#[derive(Deserialize)]
struct TextWireResponse {
    choices: Vec<TextChoice>,
}

#[derive(Deserialize)]
struct TextChoice {
    text: String,
}

#[derive(Deserialize)]
struct ChatWireResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl OpenAiProvider {
    async fn send(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<reqwest::Response, CompletionError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CompletionError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, req: &CompletionRequest) -> Result<Vec<String>, CompletionError> {
        let texts: Vec<String> = match &req.prompt {
            Prompt::Text(prompt) => {
                let body = TextWireRequest {
                    model: &req.params.model,
                    prompt,
                    temperature: req.params.temperature,
                    top_p: req.params.top_p,
                    max_tokens: req.params.max_tokens,
                    n: req.n,
                    stop: &req.params.stop,
                };
                let response = self.send("/v1/completions", &body).await?;
                let parsed = response.json::<TextWireResponse>().await?;
                parsed.choices.into_iter().map(|c| c.text).collect()
            }
            Prompt::Chat { system, user } => {
                let body = ChatWireRequest {
                    model: &req.params.model,
                    messages: vec![Message::system(system), Message::user(user)],
                    temperature: req.params.temperature,
                    top_p: req.params.top_p,
                    max_tokens: req.params.max_tokens,
                    n: req.n,
                    stop: &req.params.stop,
                };
                let response = self.send("/v1/chat/completions", &body).await?;
                let parsed = response.json::<ChatWireResponse>().await?;
                parsed
                    .choices
                    .into_iter()
                    .map(|c| c.message.content)
                    .collect()
            }
        };

        if texts.is_empty() {
            return Err(CompletionError::Empty);
        }
        Ok(texts)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
