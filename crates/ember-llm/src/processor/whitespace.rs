use std::sync::LazyLock;

use regex::{Captures, Regex};

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Trim, then collapse each whitespace run by how many newlines it holds
///
/// Two or more newlines become a paragraph break, one stays a line break,
/// anything else becomes a single space.
pub fn clean_whitespace(text: &str) -> String {
    WHITESPACE_RUN
        .replace_all(text.trim(), |caps: &Captures<'_>| {
            match caps[0].matches('\n').count() {
                0 => " ",
                1 => "\n",
                _ => "\n\n",
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_by_newline_count() {
        assert_eq!(clean_whitespace("  a   b \t c  "), "a b c");
        assert_eq!(clean_whitespace("a \n  b"), "a\nb");
        assert_eq!(clean_whitespace("a\n \n\n b"), "a\n\nb");
        assert_eq!(clean_whitespace("\r\n"), "");
    }
}
