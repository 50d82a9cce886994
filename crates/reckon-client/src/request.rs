// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Request types for the completion service.

use serde::{Deserialize, Serialize};

/// Message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role (system, user, assistant).
    pub role: String,
    /// Content.
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// The two request shapes supported against the same provider contract.
///
/// `Text` is the stateless single-prompt shape where the model continues a
/// rendered prompt. `Chat` is a system instruction plus one user turn. The
/// caller picks the shape; the provider maps it onto the matching endpoint.
#[derive(Debug, Clone)]
pub enum Prompt {
    /// Fully rendered prompt for the completion endpoint.
    Text(String),
    /// System instruction plus one user turn for the chat endpoint.
    Chat {
        /// System instruction.
        system: String,
        /// User turn.
        user: String,
    },
}

impl Prompt {
    /// Create a single-prompt request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self::Text(prompt.into())
    }

    /// Create a chat-shape request.
    pub fn chat(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self::Chat {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Sampling parameters shared by every sub-batch of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Model identifier.
    pub model: String,
    /// Stop sequences.
    pub stop: Vec<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus-probability cutoff.
    pub top_p: f32,
    /// Maximum output tokens.
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            stop: vec!["\n\n".to_string()],
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 512,
        }
    }
}

/// One sub-batch request against the provider.
///
/// Immutable once issued. `n` is the number of completions requested in this
/// sub-batch; the provider may deliver fewer and the client tops up.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// The prompt, in either request shape.
    pub prompt: Prompt,
    /// Sampling parameters.
    pub params: SamplingParams,
    /// Requested completion count for this sub-batch.
    pub n: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::system("be terse");
        assert_eq!(msg.role, "system");
        assert_eq!(msg.content, "be terse");

        let msg = Message::user("hello");
        assert_eq!(msg.role, "user");
    }

    #[test]
    fn test_prompt_shape() {
        assert!(matches!(Prompt::text("continue this"), Prompt::Text(_)));
        assert!(matches!(Prompt::chat("sys", "user"), Prompt::Chat { .. }));
    }

    #[test]
    fn test_default_params() {
        let params = SamplingParams::default();
        assert_eq!(params.temperature, 0.0);
        assert_eq!(params.top_p, 1.0);
        assert_eq!(params.max_tokens, 512);
    }
}
