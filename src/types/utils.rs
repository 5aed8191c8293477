//! Shared utility functions for string handling.

/// Truncate to at most `max_chars` characters.
///
/// Returns the (possibly shortened) prefix and whether truncation happened.
/// Counts characters rather than bytes so multi-byte text is never split.
pub fn truncate_chars(content: &str, max_chars: usize) -> (&str, bool) {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&content[..byte_idx], true),
        None => (content, false),
    }
}

/// Collapse whitespace runs into single spaces, for log lines.
pub fn one_line(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), ("abc", true));
        assert_eq!(truncate_chars("abc", 3), ("abc", false));
        assert_eq!(truncate_chars("", 0), ("", false));
        // Multi-byte characters count once each
        assert_eq!(truncate_chars("héllo", 2), ("hé", true));
    }

    #[test]
    fn test_one_line() {
        assert_eq!(one_line("a\n  b\tc"), "a b c");
    }
}
