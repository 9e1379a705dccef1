//! csv-refinery: batch CSV cleaning through a generative-language API
//!
//! An uploaded CSV is split into header and rows, the rows are sent to the
//! model in bounded batches together with a user prompt, and the cleaned
//! answers are stitched back into one CSV stored next to the input.

pub mod config;
pub mod error;
pub mod generation;
pub mod processing;
pub mod providers;
pub mod server;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, Credentials};
pub use error::{Error, Result};
pub use processing::{CsvProcessor, ProcessReport, RunStatus};
pub use providers::{GeminiClient, LlmProvider};
pub use storage::{BlobStore, ResultNaming};
