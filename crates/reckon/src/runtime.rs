// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Sandbox runtime: a capability-scoped evaluator with a persistent
//! namespace.
//!
//! Each [`SandboxRuntime`] owns one `rhai` engine plus one persistent
//! [`Scope`] — the sandbox namespace. Top-level variables *and* functions
//! defined by executed statements persist across `execute_statements` /
//! `evaluate_expression` calls on the same instance, and are never shared
//! between instances or reset automatically.
//!
//! The wall-clock deadline is cooperative: an `on_progress` hook checks the
//! armed deadline at interpreter operation boundaries and terminates the
//! run with [`ExecError::Timeout`] once past it. Arming returns a guard
//! that disarms on drop, so the deadline is cleared on every exit path.
//! The sandbox bounds time only — not memory, syscalls, or the filesystem.

use chrono::{Datelike, NaiveDate};
use rhai::{Dynamic, Engine, EvalAltResult, Scope, AST};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Date rendering used by the calendar helpers and for stringifying date
/// answers.
const DATE_FORMAT: &str = "%m/%d/%Y";

/// Failure tag for one program execution.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The armed wall-clock deadline passed before the program finished.
    #[error("execution exceeded the deadline")]
    Timeout,

    /// Parse or evaluation error inside the sandbox.
    #[error("script error: {0}")]
    Script(String),

    /// Named-symbol answer mode found nothing under the configured name.
    #[error("symbol `{0}` not defined by the program")]
    MissingSymbol(String),

    /// Stdout-capture answer mode saw no printed output.
    #[error("program produced no output")]
    NoOutput,

    /// The completion contained no executable line.
    #[error("program is empty")]
    EmptyProgram,
}

/// Stateful evaluator owning a persistent, isolated namespace.
pub struct SandboxRuntime {
    engine: Engine,
    scope: Scope<'static>,
    fn_lib: AST,
    stdout: Arc<Mutex<Vec<String>>>,
    deadline: Arc<Mutex<Option<Instant>>>,
}

impl SandboxRuntime {
    /// Runtime with an empty base namespace.
    pub fn new() -> Self {
        let stdout: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let deadline: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));

        let mut engine = Engine::new();

        let sink = Arc::clone(&stdout);
        engine.on_print(move |line| {
            if let Ok(mut buf) = sink.lock() {
                buf.push(line.to_string());
            }
        });

        let armed = Arc::clone(&deadline);
        engine.on_progress(move |_ops| {
            let expired = armed
                .lock()
                .ok()
                .and_then(|slot| *slot)
                .is_some_and(|at| Instant::now() >= at);
            if expired {
                Some("deadline".into())
            } else {
                None
            }
        });

        Self {
            engine,
            scope: Scope::new(),
            fn_lib: AST::empty(),
            stdout,
            deadline,
        }
    }

    /// Runtime seeded with calendar helpers for date-reasoning tasks:
    /// `date(y, m, d)`, `date("MM/DD/YYYY")`, `today()`, `date ± days`,
    /// `days_between(a, b)`, `days_until`/`days_since`, and
    /// `year`/`month`/`day` accessors.
    pub fn with_dates() -> Self {
        let mut runtime = Self::new();
        register_date_helpers(&mut runtime.engine);
        runtime
    }

    /// Run a full statement sequence (assignments, loops, function
    /// definitions) in the persistent namespace.
    pub fn execute_statements(&mut self, source: &str) -> Result<(), ExecError> {
        let ast = self
            .engine
            .compile(source)
            .map_err(|e| ExecError::Script(e.to_string()))?;
        // Functions from earlier calls stay callable in this one.
        let unit = self.fn_lib.merge(&ast);
        self.engine
            .eval_ast_with_scope::<Dynamic>(&mut self.scope, &unit)
            .map_err(map_eval_error)?;
        let mut lib = unit;
        lib.clear_statements();
        self.fn_lib = lib;
        Ok(())
    }

    /// Evaluate a single expression against the persistent namespace and
    /// return its value.
    pub fn evaluate_expression(&mut self, expr: &str) -> Result<Dynamic, ExecError> {
        let ast = self
            .engine
            .compile_expression(expr)
            .map_err(|e| ExecError::Script(e.to_string()))?;
        let unit = self.fn_lib.merge(&ast);
        self.engine
            .eval_ast_with_scope::<Dynamic>(&mut self.scope, &unit)
            .map_err(map_eval_error)
    }

    /// Merge caller-supplied name→value pairs into the namespace.
    pub fn inject(&mut self, vars: impl IntoIterator<Item = (String, Dynamic)>) {
        for (name, value) in vars {
            self.scope.set_or_push(name, value);
        }
    }

    /// Read a symbol out of the namespace.
    pub fn global(&self, name: &str) -> Option<Dynamic> {
        self.scope.get(name).cloned()
    }

    /// Drain everything the sandbox printed since the last drain.
    pub fn take_stdout(&self) -> Vec<String> {
        self.stdout
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Arm the wall-clock deadline. The returned guard disarms it on drop.
    #[must_use]
    pub fn arm_deadline(&self, timeout: Duration) -> DeadlineGuard {
        if let Ok(mut slot) = self.deadline.lock() {
            *slot = Some(Instant::now() + timeout);
        }
        DeadlineGuard {
            slot: Arc::clone(&self.deadline),
        }
    }
}

impl Default for SandboxRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Disarms the runtime deadline when dropped.
pub struct DeadlineGuard {
    slot: Arc<Mutex<Option<Instant>>>,
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

fn map_eval_error(err: Box<EvalAltResult>) -> ExecError {
    match *err {
        EvalAltResult::ErrorTerminated(..) => ExecError::Timeout,
        other => ExecError::Script(other.to_string()),
    }
}

/// Convert a sandbox value into a plain JSON value for consensus and
/// records. Dates render through [`DATE_FORMAT`]; anything serde cannot
/// express degrades to its display string.
pub fn to_value(value: &Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Some(date) = value.clone().try_cast::<NaiveDate>() {
        return Value::String(format_date(&date));
    }
    rhai::serde::from_dynamic::<Value>(value)
        .unwrap_or_else(|_| Value::String(value.to_string()))
}

fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn register_date_helpers(engine: &mut Engine) {
    engine.register_type_with_name::<NaiveDate>("Date");

    engine.register_fn(
        "date",
        |y: i64, m: i64, d: i64| -> Result<NaiveDate, Box<EvalAltResult>> {
            NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32)
                .ok_or_else(|| format!("invalid calendar date {y}-{m}-{d}").into())
        },
    );
    engine.register_fn(
        "date",
        |text: &str| -> Result<NaiveDate, Box<EvalAltResult>> {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
                .map_err(|e| e.to_string().into())
        },
    );
    engine.register_fn("today", || chrono::Local::now().date_naive());

    engine.register_fn("+", |d: NaiveDate, days: i64| {
        d + chrono::Duration::days(days)
    });
    engine.register_fn("-", |d: NaiveDate, days: i64| {
        d - chrono::Duration::days(days)
    });
    engine.register_fn("days_between", |a: NaiveDate, b: NaiveDate| {
        b.signed_duration_since(a).num_days()
    });
    engine.register_fn("days_until", |d: &mut NaiveDate| {
        d.signed_duration_since(chrono::Local::now().date_naive())
            .num_days()
    });
    engine.register_fn("days_since", |d: &mut NaiveDate| {
        chrono::Local::now()
            .date_naive()
            .signed_duration_since(*d)
            .num_days()
    });

    engine.register_fn("year", |d: &mut NaiveDate| d.year() as i64);
    engine.register_fn("month", |d: &mut NaiveDate| d.month() as i64);
    engine.register_fn("day", |d: &mut NaiveDate| d.day() as i64);
    engine.register_fn("to_string", |d: &mut NaiveDate| format_date(d));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_persists_across_calls() {
        let mut runtime = SandboxRuntime::new();
        runtime.execute_statements("let total = 40;").unwrap();
        runtime.execute_statements("total += 2;").unwrap();
        let value = runtime.evaluate_expression("total").unwrap();
        assert_eq!(value.as_int().unwrap(), 42);
    }

    #[test]
    fn test_functions_persist_across_calls() {
        let mut runtime = SandboxRuntime::new();
        runtime
            .execute_statements("fn solution() { 6 * 7 }")
            .unwrap();
        let value = runtime.evaluate_expression("solution()").unwrap();
        assert_eq!(value.as_int().unwrap(), 42);
    }

    #[test]
    fn test_instances_are_isolated() {
        let mut a = SandboxRuntime::new();
        let mut b = SandboxRuntime::new();
        a.execute_statements("let secret = 1;").unwrap();
        assert!(b.evaluate_expression("secret").is_err());
        assert!(b.global("secret").is_none());
    }

    #[test]
    fn test_inject_seeds_namespace() {
        let mut runtime = SandboxRuntime::new();
        runtime.inject([("n".to_string(), Dynamic::from(7_i64))]);
        let value = runtime.evaluate_expression("n * 6").unwrap();
        assert_eq!(value.as_int().unwrap(), 42);
    }

    #[test]
    fn test_evaluate_expression_is_idempotent() {
        let mut runtime = SandboxRuntime::new();
        runtime.execute_statements("let x = 3;").unwrap();
        let first = runtime.evaluate_expression("x * x").unwrap();
        let second = runtime.evaluate_expression("x * x").unwrap();
        assert_eq!(first.as_int().unwrap(), second.as_int().unwrap());
    }

    #[test]
    fn test_script_error_is_recovered() {
        let mut runtime = SandboxRuntime::new();
        let err = runtime.execute_statements("let x = ;").unwrap_err();
        assert!(matches!(err, ExecError::Script(_)));
        // The runtime stays usable.
        runtime.execute_statements("let x = 1;").unwrap();
    }

    #[test]
    fn test_busy_loop_times_out_and_runtime_survives() {
        let mut runtime = SandboxRuntime::new();
        let guard = runtime.arm_deadline(Duration::from_millis(50));
        let err = runtime
            .execute_statements("loop { }")
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout));
        drop(guard);

        // Deadline disarmed: the next program runs normally.
        runtime.execute_statements("let ok = true;").unwrap();
        assert!(runtime.global("ok").unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_deadline_guard_disarms_on_drop() {
        let mut runtime = SandboxRuntime::new();
        {
            let _guard = runtime.arm_deadline(Duration::from_millis(1));
            std::thread::sleep(Duration::from_millis(5));
        }
        // Guard dropped, so a long-enough program succeeds.
        runtime
            .execute_statements("let sum = 0; for i in 0..100 { sum += i; }")
            .unwrap();
    }

    #[test]
    fn test_stdout_capture_drains() {
        let mut runtime = SandboxRuntime::new();
        runtime
            .execute_statements("print(1 + 1);\nprint(\"done\");")
            .unwrap();
        assert_eq!(runtime.take_stdout(), vec!["2", "done"]);
        assert!(runtime.take_stdout().is_empty());
    }

    #[test]
    fn test_date_helpers() {
        let mut runtime = SandboxRuntime::with_dates();
        runtime
            .execute_statements("let start = date(2015, 12, 31);")
            .unwrap();
        let tomorrow = runtime.evaluate_expression("start + 1").unwrap();
        assert_eq!(to_value(&tomorrow), Value::String("01/01/2016".into()));

        let gap = runtime
            .evaluate_expression("days_between(date(2020, 1, 1), date(2020, 1, 31))")
            .unwrap();
        assert_eq!(gap.as_int().unwrap(), 30);

        let year = runtime.evaluate_expression("start.year()").unwrap();
        assert_eq!(year.as_int().unwrap(), 2015);
    }

    #[test]
    fn test_to_value_conversions() {
        assert_eq!(to_value(&Dynamic::from(4_i64)), Value::from(4));
        assert_eq!(to_value(&Dynamic::from("ok")), Value::String("ok".into()));
        assert_eq!(to_value(&Dynamic::from(true)), Value::Bool(true));
        assert_eq!(to_value(&Dynamic::UNIT), Value::Null);
    }
}
