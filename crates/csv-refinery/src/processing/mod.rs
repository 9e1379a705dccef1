//! Batch CSV processing: split, send, clean, stitch

mod accumulator;
mod document;
mod normalize;
mod processor;
mod report;

pub use accumulator::{AppendOutcome, HeaderCheck, ResultAccumulator};
pub use document::{Batch, CsvDocument};
pub use normalize::clean_csv_response;
pub use processor::{CsvProcessor, UTF8_BOM};
pub use report::{BatchOutcome, BatchStatus, ProcessReport, RunStatus};
