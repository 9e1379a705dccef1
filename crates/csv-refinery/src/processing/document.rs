//! Line-oriented CSV document and batch partitioning

use std::ops::Range;

use super::normalize::split_lines;
use crate::error::{Error, Result};

/// Input CSV split into its header line and data rows.
///
/// Rows are physical lines; quoted fields spanning lines are not joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDocument {
    header: String,
    rows: Vec<String>,
}

impl CsvDocument {
    /// Split text into header and rows.
    ///
    /// Fails with `Error::EmptyInput` when the text has no lines. `source`
    /// names the input in that error.
    pub fn parse(text: &str, source: &str) -> Result<Self> {
        let mut lines = split_lines(text).into_iter();
        let header = lines
            .next()
            .ok_or_else(|| Error::EmptyInput(source.to_string()))?
            .to_string();
        let rows = lines.map(str::to_string).collect();
        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Partition rows into consecutive batches of at most `batch_size`.
    ///
    /// Only the first batch asks for the header. A `batch_size` of zero is
    /// treated as one.
    pub fn batches(&self, batch_size: usize) -> Vec<Batch<'_>> {
        let batch_size = batch_size.max(1);
        self.rows
            .chunks(batch_size)
            .enumerate()
            .map(|(index, rows)| {
                let start = index * batch_size;
                Batch {
                    index,
                    header: &self.header,
                    rows,
                    range: start..start + rows.len(),
                    want_header: index == 0,
                }
            })
            .collect()
    }
}

/// Contiguous slice of data rows sent in one API call
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    /// Zero-based batch number
    pub index: usize,
    header: &'a str,
    rows: &'a [String],
    /// Data-row indices covered, zero-based, end exclusive
    pub range: Range<usize>,
    /// Whether the answer should carry the header line
    pub want_header: bool,
}

impl<'a> Batch<'a> {
    pub fn rows(&self) -> &'a [String] {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header line followed by the batch rows, newline-joined
    pub fn payload(&self) -> String {
        let capacity = self.header.len() + self.rows.iter().map(|r| r.len() + 1).sum::<usize>();
        let mut payload = String::with_capacity(capacity);
        payload.push_str(self.header);
        for row in self.rows {
            payload.push('\n');
            payload.push_str(row);
        }
        payload
    }
}
