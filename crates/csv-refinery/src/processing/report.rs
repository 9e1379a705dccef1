//! Per-run outcome reporting

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ops::Range;
use uuid::Uuid;

use super::accumulator::HeaderCheck;

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every batch succeeded
    Complete,
    /// Some batches failed; their rows are missing from the output
    Partial,
    /// Every batch failed; the output holds only the BOM
    AllFailed,
    /// Input had a header and no data rows; nothing was sent
    NoRows,
}

/// Outcome of one batch
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    Succeeded {
        lines_appended: usize,
        header: HeaderCheck,
        /// Answer rows whose field count differs from the input header's
        column_mismatches: usize,
    },
    Failed {
        error: String,
        retryable: bool,
    },
}

/// Report entry for one batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub index: usize,
    /// Data-row indices covered, zero-based, end exclusive
    pub rows: Range<usize>,
    #[serde(flatten)]
    pub status: BatchStatus,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, BatchStatus::Succeeded { .. })
    }
}

/// Everything the caller learns about a finished run
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub run_id: Uuid,
    pub input: String,
    pub output: String,
    pub status: RunStatus,
    pub total_rows: usize,
    pub batches: Vec<BatchOutcome>,
    /// Lines in the written output, header included, BOM excluded
    pub output_lines: usize,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ProcessReport {
    pub fn failed_batches(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.batches.iter().filter(|b| !b.is_success())
    }

    /// Data rows whose batch failed and which are therefore missing
    pub fn rows_lost(&self) -> usize {
        self.failed_batches().map(|b| b.rows.len()).sum()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, RunStatus::Complete | RunStatus::NoRows)
    }
}

impl RunStatus {
    /// Derive the status from batch outcomes
    pub fn from_batches(batches: &[BatchOutcome]) -> Self {
        let failed = batches.iter().filter(|b| !b.is_success()).count();
        match (batches.len(), failed) {
            (0, _) => RunStatus::NoRows,
            (_, 0) => RunStatus::Complete,
            (total, failed) if failed == total => RunStatus::AllFailed,
            _ => RunStatus::Partial,
        }
    }
}

/// Count answer records whose field count differs from `expected`.
///
/// Parsing is lenient: ragged rows are counted, malformed quoting counts as
/// a mismatch.
pub fn count_column_mismatches(cleaned: &str, expected: usize) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(cleaned.as_bytes());

    reader
        .records()
        .filter(|record| match record {
            Ok(r) => r.len() != expected,
            Err(_) => true,
        })
        .count()
}

/// Field count of a header line, 1 for anything unparseable
pub fn header_width(header: &str) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(header.as_bytes());
    reader
        .records()
        .next()
        .and_then(|r| r.ok())
        .map(|r| r.len())
        .unwrap_or(1)
}
