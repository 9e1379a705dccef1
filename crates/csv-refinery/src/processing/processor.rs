//! Batch CSV processor: chunk, transform, stitch, upload

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::accumulator::{HeaderCheck, ResultAccumulator};
use super::document::{Batch, CsvDocument};
use super::normalize::clean_csv_response;
use super::report::{
    count_column_mismatches, header_width, BatchOutcome, BatchStatus, ProcessReport, RunStatus,
};
use crate::config::ProcessingConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::{BatchRequest, LlmProvider};
use crate::storage::{BlobStore, CSV_CONTENT_TYPE};

/// Byte-order mark written at the start of every output
pub const UTF8_BOM: char = '\u{feff}';

const DEFAULT_BATCH_SIZE: usize = 2000;
const DEFAULT_FAILURE_PAUSE: Duration = Duration::from_secs(1);

/// Sends an input CSV through the model batch by batch and stores the result.
///
/// Batches run strictly in order, one at a time. A failed batch is logged,
/// followed by a fixed pause, and its rows are left out of the output.
pub struct CsvProcessor {
    store: Arc<dyn BlobStore>,
    llm: Arc<dyn LlmProvider>,
    prompt: String,
    batch_size: usize,
    failure_pause: Duration,
}

impl CsvProcessor {
    /// Create a processor with the default batch size (2000) and pause (1s)
    pub fn new(store: Arc<dyn BlobStore>, llm: Arc<dyn LlmProvider>, prompt: impl Into<String>) -> Self {
        Self {
            store,
            llm,
            prompt: prompt.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            failure_pause: DEFAULT_FAILURE_PAUSE,
        }
    }

    /// Create from processing config
    pub fn from_config(
        store: Arc<dyn BlobStore>,
        llm: Arc<dyn LlmProvider>,
        prompt: impl Into<String>,
        config: &ProcessingConfig,
    ) -> Self {
        Self::new(store, llm, prompt)
            .with_batch_size(config.batch_size)
            .with_failure_pause(config.failure_pause())
    }

    /// Set the maximum rows per batch (values below 1 become 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_failure_pause(mut self, pause: Duration) -> Self {
        self.failure_pause = pause;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Process `input` into `output`, overwriting any existing output.
    ///
    /// Fails with `Error::NotFound` or `Error::EmptyInput` before any API
    /// call. Batch failures never fail the run; they show up in the report.
    pub async fn process(&self, input: &str, output: &str) -> Result<ProcessReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        if !self.store.exists(input).await? {
            return Err(Error::NotFound(input.to_string()));
        }

        let text = self.store.read_text(input).await?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(&text);
        let document = CsvDocument::parse(text, input)?;
        let batches = document.batches(self.batch_size);

        tracing::info!(
            "Run {}: {} -> {} ({} rows, {} batch(es) of up to {}, model {}/{})",
            run_id,
            input,
            output,
            document.row_count(),
            batches.len(),
            self.batch_size,
            self.llm.name(),
            self.llm.model()
        );

        let expected_width = header_width(document.header());
        let mut accumulator = ResultAccumulator::new();
        let mut outcomes = Vec::with_capacity(batches.len());
        let mut warnings = Vec::new();

        for batch in &batches {
            let status = match self.run_batch(batch).await {
                Ok(raw) => {
                    let cleaned = clean_csv_response(&raw);
                    let appended =
                        accumulator.append(&cleaned, batch.want_header, document.header());
                    let column_mismatches = count_column_mismatches(&cleaned, expected_width);

                    if appended.header.is_warning() {
                        let message = header_warning(batch, appended.header);
                        tracing::warn!("Run {}: {}", run_id, message);
                        warnings.push(message);
                    }
                    if column_mismatches > 0 {
                        let message = format!(
                            "Rows {}-{}: {} answer row(s) do not have {} column(s)",
                            batch.range.start, batch.range.end, column_mismatches, expected_width
                        );
                        tracing::warn!("Run {}: {}", run_id, message);
                        warnings.push(message);
                    }
                    tracing::debug!(
                        "Run {}: batch {} appended {} line(s) ({:?})",
                        run_id,
                        batch.index,
                        appended.lines_appended,
                        appended.header
                    );

                    BatchStatus::Succeeded {
                        lines_appended: appended.lines_appended,
                        header: appended.header,
                        column_mismatches,
                    }
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    tracing::error!(
                        "Run {}: rows {}-{} failed ({}): {}",
                        run_id,
                        batch.range.start,
                        batch.range.end,
                        if retryable { "transient" } else { "permanent" },
                        e
                    );
                    tokio::time::sleep(self.failure_pause).await;
                    BatchStatus::Failed {
                        error: e.to_string(),
                        retryable,
                    }
                }
            };

            outcomes.push(BatchOutcome {
                index: batch.index,
                rows: batch.range.clone(),
                status,
            });
        }

        if batches.is_empty() {
            warnings.push("Input has a header but no data rows".to_string());
        } else if !outcomes[0].is_success() && !accumulator.is_empty() {
            warnings.push("First batch failed; output does not start with a requested header".to_string());
        }

        let body = accumulator.to_text();
        let mut content = String::with_capacity(body.len() + UTF8_BOM.len_utf8());
        content.push(UTF8_BOM);
        content.push_str(&body);
        self.store.write_text(output, &content, CSV_CONTENT_TYPE).await?;

        let report = ProcessReport {
            run_id,
            input: input.to_string(),
            output: output.to_string(),
            status: RunStatus::from_batches(&outcomes),
            total_rows: document.row_count(),
            batches: outcomes,
            output_lines: accumulator.line_count(),
            warnings,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            "Run {} finished: {:?}, {} line(s) written to {}, {} row(s) lost",
            run_id,
            report.status,
            report.output_lines,
            output,
            report.rows_lost()
        );

        Ok(report)
    }

    async fn run_batch(&self, batch: &Batch<'_>) -> Result<String> {
        let rules = PromptBuilder::batch_rules(batch.want_header);
        let payload = batch.payload();
        let request = BatchRequest {
            rules: &rules,
            prompt: &self.prompt,
            csv: &payload,
            want_header: batch.want_header,
        };
        self.llm.generate(&request).await
    }
}

fn header_warning(batch: &Batch<'_>, check: HeaderCheck) -> String {
    let what = match check {
        HeaderCheck::Rewritten => "model changed the header line",
        HeaderCheck::StrayHeader => "model repeated the input header after changing it; kept as data",
        HeaderCheck::Unanchored => "no header to compare against; answer appended as-is",
        _ => "unexpected header handling",
    };
    format!("Rows {}-{}: {}", batch.range.start, batch.range.end, what)
}
