//! LLM provider trait for transforming CSV batches

use async_trait::async_trait;

use crate::error::Result;

/// One batch round trip: three text parts sent in a single user turn
#[derive(Debug, Clone, Copy)]
pub struct BatchRequest<'a> {
    /// Fixed rules block (CSV output, header handling, column preservation)
    pub rules: &'a str,
    /// User-supplied transformation prompt
    pub prompt: &'a str,
    /// Header line followed by the batch's rows
    pub csv: &'a str,
    /// Whether the answer should start with the header line
    pub want_header: bool,
}

/// Trait for text-in/text-out generation used by the batch processor
///
/// Implementations:
/// - `GeminiClient`: Google Generative Language API (`generateContent`)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one batch and return the raw model text.
    ///
    /// Network failures and non-success statuses return
    /// `Error::ApiCallFailed`; a body without the expected text returns
    /// `Error::ResponseParseFailed`.
    async fn generate(&self, request: &BatchRequest<'_>) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
