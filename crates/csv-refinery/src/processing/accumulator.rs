//! Stitching cleaned batch answers into one CSV body

use serde::Serialize;

/// What the header check concluded for one appended answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderCheck {
    /// Header was requested and the answer starts with the input header
    Kept,
    /// Header was requested but the answer's first line differs from the
    /// input header; kept as the output header
    Rewritten,
    /// Header was not requested, the model echoed it anyway; dropped once
    EchoDropped,
    /// Header was not requested and the answer starts with data
    Absent,
    /// Header was not requested; the first line equals the input header but
    /// not the output's first line, so it was kept as data
    StrayHeader,
    /// Nothing had been accumulated yet, so there was no header to compare
    /// against; lines appended as-is
    Unanchored,
    /// Answer had no lines
    Empty,
}

impl HeaderCheck {
    /// Whether this outcome deserves a warning in logs and reports
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            HeaderCheck::Rewritten | HeaderCheck::StrayHeader | HeaderCheck::Unanchored
        )
    }
}

/// Result of appending one answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub lines_appended: usize,
    pub header: HeaderCheck,
}

/// Growing output body, one entry per CSV line
#[derive(Debug, Clone, Default)]
pub struct ResultAccumulator {
    lines: Vec<String>,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// First accumulated line, normally the output header
    pub fn first_line(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Append a cleaned answer.
    ///
    /// When the accumulator already has content and `want_header` is false,
    /// a first line equal (after trimming) to the accumulator's first line is
    /// dropped. `input_header` only feeds the classification.
    pub fn append(&mut self, cleaned: &str, want_header: bool, input_header: &str) -> AppendOutcome {
        if cleaned.trim().is_empty() {
            return AppendOutcome {
                lines_appended: 0,
                header: HeaderCheck::Empty,
            };
        }

        let mut new_lines = cleaned.lines();
        let first = new_lines.clone().next().unwrap_or_default();
        let matches_input = first.trim() == input_header.trim();

        let header = match (want_header, self.first_line()) {
            (true, _) if matches_input => HeaderCheck::Kept,
            (true, _) => HeaderCheck::Rewritten,
            (false, None) => HeaderCheck::Unanchored,
            (false, Some(existing)) if existing.trim() == first.trim() => {
                new_lines.next();
                HeaderCheck::EchoDropped
            }
            (false, Some(_)) if matches_input => HeaderCheck::StrayHeader,
            (false, Some(_)) => HeaderCheck::Absent,
        };

        let before = self.lines.len();
        self.lines.extend(new_lines.map(str::to_string));

        AppendOutcome {
            lines_appended: self.lines.len() - before,
            header,
        }
    }

    /// Joined body without trailing newline
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}
