//! Instruction text sent alongside each batch

pub mod prompt;

pub use prompt::PromptBuilder;
