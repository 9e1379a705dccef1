//! Provider abstraction over the text-generation API
//!
//! The processor depends on `LlmProvider` only, so tests can swap in a
//! scripted fake and deployments pick the Gemini client.

pub mod gemini;
pub mod llm;

pub use gemini::GeminiClient;
pub use llm::{BatchRequest, LlmProvider};
