//! Cleanup of raw model answers into bare CSV text

const FENCE: &str = "```";

/// Normalize a model answer.
///
/// Trims the answer; when it opens with a code fence, strips the fence
/// backticks from both ends and a leading `csv` tag line; right-trims every
/// line and drops blank ones.
pub fn clean_csv_response(raw: &str) -> String {
    let mut text = raw.trim();
    let fenced = text.starts_with(FENCE);
    if fenced {
        text = text.trim_matches('`');
    }

    let mut lines = split_lines(text);
    if fenced
        && lines
            .first()
            .is_some_and(|first| first.trim().eq_ignore_ascii_case("csv"))
    {
        lines.remove(0);
    }

    lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split on `\n`, `\r\n` or a lone `\r`, without a trailing empty line
pub(crate) fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\n', '\r']) {
            Some(at) => {
                lines.push(&rest[..at]);
                let width = if rest[at..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[at + width..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(clean_csv_response("a,b\n1,2"), "a,b\n1,2");
    }

    #[test]
    fn test_fence_with_csv_tag() {
        let raw = "\n```csv\na,b\n1,2\n```\n";
        assert_eq!(clean_csv_response(raw), "a,b\n1,2");

        let upper = "```CSV\r\na,b\r\n1,2\r\n```";
        assert_eq!(clean_csv_response(upper), "a,b\n1,2");
    }

    #[test]
    fn test_fence_without_tag() {
        assert_eq!(clean_csv_response("```\na,b\n1,2\n```"), "a,b\n1,2");
    }

    #[test]
    fn test_other_tag_kept_as_data() {
        // Only a `csv` tag is recognised
        assert_eq!(clean_csv_response("```text\n1,2\n```"), "text\n1,2");
    }

    #[test]
    fn test_blank_lines_and_trailing_space_removed() {
        let raw = "a,b  \n\n   \n1,2\t\n\n3,4";
        assert_eq!(clean_csv_response(raw), "a,b\n1,2\n3,4");
    }

    #[test]
    fn test_leading_whitespace_in_cells_kept() {
        assert_eq!(clean_csv_response("a,b\n  1,2"), "a,b\n  1,2");
    }

    #[test]
    fn test_empty_and_fence_only() {
        assert_eq!(clean_csv_response(""), "");
        assert_eq!(clean_csv_response("  \n \n"), "");
        assert_eq!(clean_csv_response("```csv```"), "");
        assert_eq!(clean_csv_response("```csv\n```"), "");
    }

    #[test]
    fn test_bare_carriage_returns_split() {
        assert_eq!(clean_csv_response("a,b\r1,2\r3,4"), "a,b\n1,2\n3,4");
        assert_eq!(clean_csv_response("```csv\ra,b\r\r1,2\r```"), "a,b\n1,2");
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\r\nb\rc\nd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n"), vec!["a"]);
        assert_eq!(split_lines("a\r\n\r\nb"), vec!["a", "", "b"]);
        assert_eq!(split_lines("\n"), vec![""]);
        assert!(split_lines("").is_empty());
    }
}
