//! Rules block for CSV batch transformation

/// Prompt builder for batch requests
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the fixed rules block sent before the user prompt.
    ///
    /// Only the header rule changes between the first batch and the rest.
    pub fn batch_rules(want_header: bool) -> String {
        let header_rule = if want_header {
            "This is the first batch: your answer MUST start with the header line."
        } else {
            "Do NOT include the header line in your answer for this batch."
        };

        format!(
            r#"You are an AI that processes CSV data.
1) Always return the result in CSV format.
2) {header_rule}
3) Keep the number and order of columns unchanged.
4) If a row cannot be processed, still return that row, leaving the affected columns empty."#,
            header_rule = header_rule
        )
    }
}
