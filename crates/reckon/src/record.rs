// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Line-delimited JSON records exchanged with scoring tools.
//!
//! One record per question: the original input example (flattened), the
//! pipeline's answer, a correctness score, and the raw generation history.
//! Scoring collaborators consume these files as-is, so the shape is the
//! interchange contract.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// One evaluated question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRecord {
    /// The original input example, carried through field-for-field.
    #[serde(flatten)]
    pub example: Map<String, Value>,
    /// The pipeline's returned answer (`null` when no result).
    pub answer: Value,
    /// Correctness score, 0 or 1.
    pub score: u32,
    /// Raw generation history for this question.
    pub generation: Value,
}

/// Appending line-delimited writer, flushed per record so partial runs
/// stay resumable.
pub struct RecordWriter {
    inner: BufWriter<File>,
}

impl RecordWriter {
    /// Create or truncate the output file.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            inner: BufWriter::new(File::create(path)?),
        })
    }

    /// Open the output file for appending.
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: BufWriter::new(file),
        })
    }

    /// Write one record as a JSON line and flush.
    pub fn write(&mut self, record: &EvalRecord) -> io::Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.inner, "{line}")?;
        self.inner.flush()
    }
}

/// Read every record from a JSONL file.
pub fn read_jsonl(path: impl AsRef<Path>) -> io::Result<Vec<EvalRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
