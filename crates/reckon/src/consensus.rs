// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Majority-vote consensus over program outcomes.

use serde_json::Value;

/// Whether two outcomes count as the same answer.
///
/// Numbers compare numerically, so `4` and `4.0` fall into one bucket;
/// everything else compares by exact equality.
fn same_answer(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Select the most frequent value.
///
/// Ties break to the value first observed in sample order, so the result is
/// deterministic given a deterministic completion order. The tally is
/// list-based rather than hashed, which preserves first-seen order by
/// construction. Each bucket is represented by its first-seen value. Empty
/// input yields `None`.
pub fn majority_vote(outcomes: &[Value]) -> Option<Value> {
    let mut tally: Vec<(&Value, usize)> = Vec::new();
    for outcome in outcomes {
        match tally.iter_mut().find(|(value, _)| same_answer(value, outcome)) {
            Some(entry) => entry.1 += 1,
            None => tally.push((outcome, 1)),
        }
    }

    let mut best: Option<(&Value, usize)> = None;
    for (value, count) in tally {
        // Strictly greater keeps the earliest value on ties.
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.clone())
}
