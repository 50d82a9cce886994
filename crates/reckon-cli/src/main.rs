// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Reckon evaluation driver.
//!
//! Thin glue over the library: reads a JSONL dataset, runs each question
//! through the pipeline, scores answers, and writes the interchange
//! records. One failing question never halts the rest of the set.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use reckon::{
    prompts, record, AnswerPolicy, EvalRecord, ProgramChatInterface, ProgramInterface,
    RecordWriter, RunOptions, SandboxRuntime,
};
use reckon_client::{CompletionClient, OpenAiProvider, RetryPolicy};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "reckon")]
#[command(about = "Answer questions by generating, executing, and voting over programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a JSONL dataset of {"input", "target"} questions
    Eval {
        /// Dataset path
        #[arg(short, long)]
        dataset: PathBuf,

        /// Output records path
        #[arg(short, long)]
        output: PathBuf,

        /// Resume: skip questions already recorded in the output
        #[arg(long)]
        append: bool,

        /// Prompt template file ({question} placeholder); defaults to the
        /// built-in math prompt
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question
        question: String,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Args)]
struct PipelineArgs {
    /// Model identifier
    #[arg(long, default_value = "gpt-3.5-turbo")]
    model: String,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,

    /// Nucleus-probability cutoff
    #[arg(long, default_value_t = 1.0)]
    top_p: f32,

    /// Maximum output tokens
    #[arg(long, default_value_t = 512)]
    max_tokens: u32,

    /// Samples per question (majority vote above 1)
    #[arg(long, default_value_t = 1)]
    samples: usize,

    /// Per-program deadline, seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Answer mode: read the last non-empty stdout line
    #[arg(long)]
    from_stdout: bool,

    /// Answer mode: read this symbol from the namespace
    #[arg(long)]
    answer_symbol: Option<String>,

    /// Answer mode: evaluate this expression after the program
    #[arg(long)]
    answer_expr: Option<String>,

    /// Seed the sandbox with calendar helpers
    #[arg(long)]
    dates: bool,

    /// Use the chat endpoint: one completion per question, fenced code,
    /// no majority vote; the default answer mode calls solution()
    #[arg(long)]
    chat: bool,
}

impl PipelineArgs {
    /// Policy flags checked in priority order: stdout, symbol, expression,
    /// then the last-line default.
    fn policy(&self) -> AnswerPolicy {
        if self.from_stdout {
            AnswerPolicy::Stdout
        } else if let Some(symbol) = &self.answer_symbol {
            AnswerPolicy::Symbol(symbol.clone())
        } else if let Some(expr) = &self.answer_expr {
            AnswerPolicy::Expression(expr.clone())
        } else {
            AnswerPolicy::LastLine
        }
    }

    fn run_options(&self) -> RunOptions {
        RunOptions::default()
            .with_timeout(Duration::from_secs(self.timeout))
            .with_samples(self.samples)
            .with_temperature(self.temperature)
    }

    fn client(&self, policy: RetryPolicy) -> anyhow::Result<CompletionClient> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY is not set")?;
        let mut provider = OpenAiProvider::new(api_key);
        if let Ok(base_url) = std::env::var("RECKON_BASE_URL") {
            provider = provider.with_base_url(base_url);
        }
        Ok(CompletionClient::new(Arc::new(provider)).with_policy(policy))
    }

    fn runtime(&self) -> SandboxRuntime {
        if self.dates {
            SandboxRuntime::with_dates()
        } else {
            SandboxRuntime::new()
        }
    }

    fn pipeline(&self) -> anyhow::Result<Pipeline> {
        if self.chat {
            // Chat endpoint backs off in fixed steps rather than doubling.
            let client = self.client(RetryPolicy::linear(20, Duration::from_secs(5)))?;
            let itf = ProgramChatInterface::new(
                client,
                &self.model,
                prompts::MATH_CHAT_SYSTEM_MESSAGE,
            )
            .with_runtime(self.runtime())
            .with_policy(chat_policy(self.policy()));
            Ok(Pipeline::Chat(itf))
        } else {
            let client = self.client(RetryPolicy::default())?;
            let itf = ProgramInterface::new(client, &self.model)
                .with_runtime(self.runtime())
                .with_policy(self.policy());
            Ok(Pipeline::Completion(itf))
        }
    }
}

/// The chat prompt asks for a `solution()` entry point, so the default
/// answer mode evaluates it.
fn chat_policy(policy: AnswerPolicy) -> AnswerPolicy {
    match policy {
        AnswerPolicy::LastLine => AnswerPolicy::Expression("solution()".to_string()),
        other => other,
    }
}

/// Driver-side wrapper over the two interface variants.
enum Pipeline {
    Completion(ProgramInterface),
    Chat(ProgramChatInterface),
}

impl Pipeline {
    /// Render the prompt for one question. The chat variant sends the bare
    /// question; its system instruction carries the format contract.
    fn prompt_for(&self, template: &str, question: &str) -> String {
        match self {
            Self::Completion(_) => prompts::format_prompt(template, question),
            Self::Chat(_) => question.to_string(),
        }
    }

    async fn run(
        &mut self,
        prompt: &str,
        opts: &RunOptions,
    ) -> reckon::Result<Option<serde_json::Value>> {
        match self {
            Self::Completion(itf) => itf.run(prompt, opts).await,
            Self::Chat(itf) => itf.run(prompt, opts).await.map(Some),
        }
    }

    fn generation(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Completion(itf) => serde_json::to_value(itf.history()),
            Self::Chat(itf) => serde_json::to_value(itf.history()),
        }
    }

    fn clear_history(&mut self) {
        match self {
            Self::Completion(itf) => itf.clear_history(),
            Self::Chat(itf) => itf.clear_history(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Eval {
            dataset,
            output,
            append,
            prompt_file,
            pipeline,
        } => eval(dataset, output, append, prompt_file, pipeline).await,
        Commands::Ask { question, pipeline } => ask(question, pipeline).await,
    }
}

async fn ask(question: String, pipeline: PipelineArgs) -> anyhow::Result<()> {
    let mut itf = pipeline.pipeline()?;
    let prompt = itf.prompt_for(prompts::MATH_PROMPT, &question);

    match itf.run(&prompt, &pipeline.run_options()).await? {
        Some(answer) => println!("{answer}"),
        None => bail!("no result: every sampled program failed"),
    }
    Ok(())
}

async fn eval(
    dataset: PathBuf,
    output: PathBuf,
    append: bool,
    prompt_file: Option<PathBuf>,
    pipeline: PipelineArgs,
) -> anyhow::Result<()> {
    let template = match prompt_file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading prompt template {}", path.display()))?,
        None => prompts::MATH_PROMPT.to_string(),
    };

    let examples = read_examples(&dataset)?;

    // On resume the printed accuracy spans the whole dataset, so carry the
    // totals of the records already written.
    let (skip, resumed_correct) = if append {
        resume_totals(&output)?
    } else {
        (0, 0)
    };

    let mut writer = if append {
        RecordWriter::append(&output)?
    } else {
        RecordWriter::create(&output)?
    };

    let mut itf = pipeline.pipeline()?;
    let opts = pipeline.run_options();

    let total = examples.len();
    let mut correct = resumed_correct;
    let mut seen = skip;

    for (index, example) in examples.into_iter().enumerate().skip(skip) {
        let input = example
            .get("input")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let prompt = itf.prompt_for(&template, &input);

        // A failing question is scored zero and the batch moves on.
        let answer = match itf.run(&prompt, &opts).await {
            Ok(Some(answer)) => answer,
            Ok(None) => {
                tracing::warn!(index, "no result");
                Value::Null
            }
            Err(error) => {
                tracing::warn!(index, %error, "question failed");
                Value::Null
            }
        };

        let score = score_answer(&answer, example.get("target"));
        correct += score as usize;
        seen += 1;

        writer.write(&EvalRecord {
            example,
            answer,
            score,
            generation: itf.generation()?,
        })?;
        itf.clear_history();

        tracing::info!(
            question = index + 1,
            total,
            accuracy = correct as f64 / seen as f64,
            "progress"
        );
    }

    println!("Accuracy - {}", correct as f64 / seen.max(1) as f64);
    Ok(())
}

/// Totals from an existing output file: records already written, and how
/// many of them scored correct. `(0, 0)` when the file does not exist yet.
fn resume_totals(path: &PathBuf) -> anyhow::Result<(usize, usize)> {
    if !path.exists() {
        return Ok((0, 0));
    }
    let records = record::read_jsonl(path)?;
    let correct = records.iter().map(|r| r.score as usize).sum();
    Ok((records.len(), correct))
}

fn read_examples(path: &PathBuf) -> anyhow::Result<Vec<Map<String, Value>>> {
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("opening dataset {}", path.display()))?,
    );
    let mut examples = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        examples.push(serde_json::from_str(&line)?);
    }
    Ok(examples)
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 1 when the answer matches the target: numerically within 1e-3, or by
/// exact string equality otherwise.
fn score_answer(answer: &Value, target: Option<&Value>) -> u32 {
    let Some(target) = target else { return 0 };
    if let (Some(a), Some(t)) = (numeric(answer), numeric(target)) {
        return u32::from((a - t).abs() < 1e-3);
    }
    u32::from(answer == target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_numeric_tolerance() {
        assert_eq!(score_answer(&json!(4.0004), Some(&json!(4))), 1);
        assert_eq!(score_answer(&json!(4.01), Some(&json!(4))), 0);
    }

    #[test]
    fn test_score_numeric_string_answer() {
        assert_eq!(score_answer(&json!("42"), Some(&json!(42.0))), 1);
    }

    #[test]
    fn test_score_string_equality() {
        assert_eq!(score_answer(&json!("01/05/2021"), Some(&json!("01/05/2021"))), 1);
        assert_eq!(score_answer(&json!("01/05/2021"), Some(&json!("01/06/2021"))), 0);
    }

    #[test]
    fn test_score_null_answer() {
        assert_eq!(score_answer(&Value::Null, Some(&json!(3))), 0);
        assert_eq!(score_answer(&json!(3), None), 0);
    }

    fn record_with_score(score: u32) -> EvalRecord {
        let mut example = Map::new();
        example.insert("input".into(), json!("q"));
        EvalRecord {
            example,
            answer: json!(1),
            score,
            generation: json!([]),
        }
    }

    #[test]
    fn test_resume_totals_span_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");

        let mut writer = RecordWriter::create(&path).unwrap();
        for score in [1, 0, 1] {
            writer.write(&record_with_score(score)).unwrap();
        }
        drop(writer);

        assert_eq!(resume_totals(&path).unwrap(), (3, 2));
    }

    #[test]
    fn test_resume_totals_without_output_file() {
        let path = PathBuf::from("/nonexistent/out.jsonl");
        assert_eq!(resume_totals(&path).unwrap(), (0, 0));
    }

    #[test]
    fn test_chat_default_policy_calls_solution() {
        assert_eq!(
            chat_policy(AnswerPolicy::LastLine),
            AnswerPolicy::Expression("solution()".into())
        );
        assert_eq!(chat_policy(AnswerPolicy::Stdout), AnswerPolicy::Stdout);
    }
}
