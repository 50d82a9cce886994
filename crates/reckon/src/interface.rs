// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Caller-facing interfaces composing the pipeline.
//!
//! [`ProgramInterface`] is the full generate → execute → consensus path.
//! [`ProgramChatInterface`] is the chat-oriented variant: exactly one
//! completion, fenced extraction, no aggregation. [`TextInterface`] skips
//! code execution entirely and parses the answer out of the completion
//! text.
//!
//! All interfaces are single-threaded and non-reentrant: one question is
//! processed to completion before the next starts, and the N sampled
//! programs run strictly sequentially against one runtime instance.

use crate::consensus::majority_vote;
use crate::error::Result;
use crate::extract::Program;
use crate::runtime::{to_value, ExecError, SandboxRuntime};
use reckon_client::{CompletionClient, Prompt, SamplingParams};
use serde_json::Value;
use std::time::Duration;

/// Fence tag of the sandbox's script language.
const LANGUAGE: &str = "rhai";

/// How the final answer is pulled out of an executed program.
///
/// Checked in this priority order when configured from flags: stdout
/// capture, named symbol, configured expression, then the default
/// last-line-as-expression mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnswerPolicy {
    /// Run the whole program; the answer is the last non-empty line it
    /// printed.
    Stdout,
    /// Run the whole program, then read this symbol from the namespace.
    Symbol(String),
    /// Run the whole program, then evaluate this expression against the
    /// resulting namespace (e.g. a designated entry-point call).
    Expression(String),
    /// Run all lines but the last, then evaluate the last line as an
    /// expression.
    #[default]
    LastLine,
}

/// Per-run knobs passed alongside the prompt.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Wall-clock deadline per sampled program.
    pub timeout: Duration,
    /// Number of independent samples folded by majority vote.
    pub sample_count: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus-probability cutoff.
    pub top_p: f32,
    /// Maximum output tokens.
    pub max_tokens: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            sample_count: 1,
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 512,
        }
    }
}

impl RunOptions {
    /// Set the per-program deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sample count for majority voting.
    pub fn with_samples(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count.max(1);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Execute one program under an answer policy against a runtime.
fn execute_with_policy(
    runtime: &mut SandboxRuntime,
    policy: &AnswerPolicy,
    program: &Program,
) -> std::result::Result<Value, ExecError> {
    if program.is_empty() {
        return Err(ExecError::EmptyProgram);
    }
    match policy {
        AnswerPolicy::Stdout => {
            runtime.take_stdout(); // discard anything stale
            runtime.execute_statements(&program.source())?;
            let lines = runtime.take_stdout();
            lines
                .iter()
                .rev()
                .find(|line| !line.trim().is_empty())
                .map(|line| Value::String(line.trim().to_string()))
                .ok_or(ExecError::NoOutput)
        }
        AnswerPolicy::Symbol(name) => {
            runtime.execute_statements(&program.source())?;
            let value = runtime
                .global(name)
                .ok_or_else(|| ExecError::MissingSymbol(name.clone()))?;
            Ok(to_value(&value))
        }
        AnswerPolicy::Expression(expr) => {
            runtime.execute_statements(&program.source())?;
            let value = runtime.evaluate_expression(expr)?;
            Ok(to_value(&value))
        }
        AnswerPolicy::LastLine => {
            let (statements, expr) = program
                .split_last_expression()
                .ok_or(ExecError::EmptyProgram)?;
            if !statements.trim().is_empty() {
                runtime.execute_statements(&statements)?;
            }
            let value = runtime.evaluate_expression(expr)?;
            Ok(to_value(&value))
        }
    }
}

/// The generate → sandboxed-execute → consensus pipeline.
pub struct ProgramInterface {
    client: CompletionClient,
    runtime: SandboxRuntime,
    model: String,
    stop: Vec<String>,
    policy: AnswerPolicy,
    fenced: bool,
    history: Vec<Vec<String>>,
}

impl ProgramInterface {
    /// Create an interface over a completion client.
    pub fn new(client: CompletionClient, model: impl Into<String>) -> Self {
        Self {
            client,
            runtime: SandboxRuntime::new(),
            model: model.into(),
            stop: vec!["\n\n".to_string()],
            policy: AnswerPolicy::default(),
            fenced: false,
            history: Vec::new(),
        }
    }

    /// Replace the sandbox runtime (e.g. a date-seeded one).
    pub fn with_runtime(mut self, runtime: SandboxRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    /// Set the answer-resolution policy.
    pub fn with_policy(mut self, policy: AnswerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the stop sequences.
    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    /// Strip markdown fences from completions before execution.
    pub fn with_fenced_extraction(mut self) -> Self {
        self.fenced = true;
        self
    }

    /// Mutable access to the runtime, for injecting fixtures.
    pub fn runtime_mut(&mut self) -> &mut SandboxRuntime {
        &mut self.runtime
    }

    /// Raw completions recorded since the last clear, one entry per
    /// `generate` call. Debugging and audit only — never consulted for
    /// answer computation.
    pub fn history(&self) -> &[Vec<String>] {
        &self.history
    }

    /// Reset the completion log between logically distinct questions.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn sampling_params(&self, opts: &RunOptions) -> SamplingParams {
        SamplingParams {
            model: self.model.clone(),
            stop: self.stop.clone(),
            temperature: opts.temperature,
            top_p: opts.top_p,
            max_tokens: opts.max_tokens,
        }
    }

    fn extract_program(&self, raw: &str) -> Program {
        if self.fenced {
            Program::from_fenced(raw, LANGUAGE)
        } else {
            Program::from_text(raw)
        }
    }

    /// Sample `opts.sample_count` completions and turn each into a program.
    pub async fn generate(&mut self, prompt: &str, opts: &RunOptions) -> Result<Vec<Program>> {
        let params = self.sampling_params(opts);
        let texts = self
            .client
            .complete(&Prompt::text(prompt), &params, opts.sample_count)
            .await?;
        let programs = texts.iter().map(|t| self.extract_program(t)).collect();
        self.history.push(texts);
        Ok(programs)
    }

    /// Compute one outcome for one program under the configured policy.
    pub fn execute(&mut self, program: &Program) -> std::result::Result<Value, ExecError> {
        execute_with_policy(&mut self.runtime, &self.policy, program)
    }

    /// Run the full pipeline for one question.
    ///
    /// Programs whose outcome is a failure are discarded (logged, not
    /// retried) and never abort their siblings. `Ok(None)` is the
    /// "no result" sentinel: every sampled program failed.
    pub async fn run(&mut self, prompt: &str, opts: &RunOptions) -> Result<Option<Value>> {
        let programs = self.generate(prompt, opts).await?;

        let mut outcomes = Vec::with_capacity(programs.len());
        for (sample, program) in programs.iter().enumerate() {
            let guard = self.runtime.arm_deadline(opts.timeout);
            let outcome = self.execute(program);
            drop(guard);

            match outcome {
                Ok(value) => outcomes.push(value),
                Err(error) => {
                    tracing::warn!(sample, %error, "program discarded");
                }
            }
        }

        if outcomes.is_empty() {
            tracing::warn!(
                samples = programs.len(),
                "every sampled program failed; no result"
            );
            return Ok(None);
        }
        Ok(majority_vote(&outcomes))
    }
}

/// Chat-oriented pipeline variant: one completion, no aggregation.
///
/// Relies on a fixed system instruction to bias the chat model toward code
/// output, and strips the markdown fence the model wraps it in. Execution
/// failures surface as typed errors rather than a partial result.
pub struct ProgramChatInterface {
    client: CompletionClient,
    runtime: SandboxRuntime,
    model: String,
    system_message: String,
    stop: Vec<String>,
    policy: AnswerPolicy,
    history: Vec<String>,
}

impl ProgramChatInterface {
    /// Create a chat-variant interface.
    pub fn new(
        client: CompletionClient,
        model: impl Into<String>,
        system_message: impl Into<String>,
    ) -> Self {
        Self {
            client,
            runtime: SandboxRuntime::new(),
            model: model.into(),
            system_message: system_message.into(),
            stop: Vec::new(),
            policy: AnswerPolicy::default(),
            history: Vec::new(),
        }
    }

    /// Replace the sandbox runtime.
    pub fn with_runtime(mut self, runtime: SandboxRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    /// Set the answer-resolution policy.
    pub fn with_policy(mut self, policy: AnswerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Raw completions recorded since the last clear.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Reset the completion log.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Issue exactly one chat completion, extract its fenced program, and
    /// execute it under the configured policy and deadline.
    pub async fn run(&mut self, prompt: &str, opts: &RunOptions) -> Result<Value> {
        let params = SamplingParams {
            model: self.model.clone(),
            stop: self.stop.clone(),
            temperature: opts.temperature,
            top_p: opts.top_p,
            max_tokens: opts.max_tokens,
        };
        let texts = self
            .client
            .complete(
                &Prompt::chat(self.system_message.clone(), prompt),
                &params,
                1,
            )
            .await?;
        let text = texts.into_iter().next().unwrap_or_default();
        self.history.push(text.clone());

        let program = Program::from_fenced(&text, LANGUAGE);
        let guard = self.runtime.arm_deadline(opts.timeout);
        let outcome = execute_with_policy(&mut self.runtime, &self.policy, &program);
        drop(guard);

        Ok(outcome?)
    }
}

/// Signature of a caller-supplied answer extractor.
pub type AnswerExtractor = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Text-only variant: no code execution, the answer is parsed straight out
/// of the completion text.
pub struct TextInterface {
    client: CompletionClient,
    model: String,
    stop: Vec<String>,
    answer_prefix: String,
    extractor: Option<AnswerExtractor>,
    history: Vec<String>,
}

impl TextInterface {
    /// Create a text-only interface.
    pub fn new(client: CompletionClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            stop: vec!["\n\n\n".to_string()],
            answer_prefix: "The answer is:".to_string(),
            extractor: None,
            history: Vec::new(),
        }
    }

    /// Set the prefix stripped from the answer line.
    pub fn with_answer_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.answer_prefix = prefix.into();
        self
    }

    /// Replace the stop sequences.
    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    /// Override answer parsing entirely.
    pub fn with_extractor(mut self, extractor: AnswerExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Raw completions recorded since the last clear.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Reset the completion log.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn extract_answer(&self, text: &str) -> String {
        if let Some(extractor) = &self.extractor {
            return extractor(text);
        }
        let last_line = text.trim().lines().last().unwrap_or("");
        last_line
            .strip_prefix(&self.answer_prefix)
            .unwrap_or(last_line)
            .trim()
            .to_string()
    }

    /// Issue one completion and parse the answer from its final line.
    pub async fn run(&mut self, prompt: &str, temperature: f32) -> Result<String> {
        let params = SamplingParams {
            model: self.model.clone(),
            stop: self.stop.clone(),
            temperature,
            top_p: 1.0,
            max_tokens: 512,
        };
        let texts = self
            .client
            .complete(&Prompt::text(prompt), &params, 1)
            .await?;
        let text = texts.into_iter().next().unwrap_or_default();
        self.history.push(text.clone());
        Ok(self.extract_answer(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_last_line() {
        assert_eq!(AnswerPolicy::default(), AnswerPolicy::LastLine);
    }

    #[test]
    fn test_execute_with_policy_last_line() {
        let mut runtime = SandboxRuntime::new();
        let program = Program::from_text("let x = 2 + 2;\nx");
        let value =
            execute_with_policy(&mut runtime, &AnswerPolicy::LastLine, &program).unwrap();
        assert_eq!(value, Value::from(4));
    }

    #[test]
    fn test_execute_with_policy_symbol() {
        let mut runtime = SandboxRuntime::new();
        let program = Program::from_text("let answer = 10;");
        let value = execute_with_policy(
            &mut runtime,
            &AnswerPolicy::Symbol("answer".into()),
            &program,
        )
        .unwrap();
        assert_eq!(value, Value::from(10));
    }

    #[test]
    fn test_execute_with_policy_symbol_missing() {
        let mut runtime = SandboxRuntime::new();
        let program = Program::from_text("let other = 1;");
        let err = execute_with_policy(
            &mut runtime,
            &AnswerPolicy::Symbol("answer".into()),
            &program,
        )
        .unwrap_err();
        assert!(matches!(err, ExecError::MissingSymbol(name) if name == "answer"));
    }

    #[test]
    fn test_execute_with_policy_expression() {
        let mut runtime = SandboxRuntime::new();
        let program = Program::from_text("fn solution() { 21 * 2 }");
        let value = execute_with_policy(
            &mut runtime,
            &AnswerPolicy::Expression("solution()".into()),
            &program,
        )
        .unwrap();
        assert_eq!(value, Value::from(42));
    }

    #[test]
    fn test_execute_with_policy_stdout() {
        let mut runtime = SandboxRuntime::new();
        let program = Program::from_text("print(\"scratch\");\nprint(6 * 7);");
        let value =
            execute_with_policy(&mut runtime, &AnswerPolicy::Stdout, &program).unwrap();
        assert_eq!(value, Value::String("42".into()));
    }

    #[test]
    fn test_execute_with_policy_stdout_no_output() {
        let mut runtime = SandboxRuntime::new();
        let program = Program::from_text("let silent = 1;");
        let err =
            execute_with_policy(&mut runtime, &AnswerPolicy::Stdout, &program).unwrap_err();
        assert!(matches!(err, ExecError::NoOutput));
    }

    #[test]
    fn test_empty_program_is_an_error() {
        let mut runtime = SandboxRuntime::new();
        let program = Program::from_text("\n\n");
        let err =
            execute_with_policy(&mut runtime, &AnswerPolicy::LastLine, &program).unwrap_err();
        assert!(matches!(err, ExecError::EmptyProgram));
    }
}
