//! Text normalization for narration.

use log::error;
use once_cell::sync::Lazy;
use regex::Regex;

/// Anything that is not a word character, whitespace, or `. , ! ? -`.
static DISALLOWED: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[^\w\s.,!?-]").ok());

static WHITESPACE_RUN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s+").ok());

/// Normalize raw page text for synthesis.
///
/// Trims, collapses whitespace (newlines included) to single spaces,
/// strips characters outside `[\w\s.,!?-]` and trims again. Nothing is
/// mapped, so a symbol between two spaces leaves a double space. Returns
/// `None` if the patterns are unavailable.
pub fn normalize_text(text: &str) -> Option<String> {
    let (Some(disallowed), Some(whitespace)) = (DISALLOWED.as_ref(), WHITESPACE_RUN.as_ref())
    else {
        error!("Text normalization patterns failed to compile");
        return None;
    };

    let collapsed = whitespace.replace_all(text.trim(), " ");
    let stripped = disallowed.replace_all(&collapsed, "");
    Some(stripped.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(text: &str) -> String {
        normalize_text(text).unwrap()
    }

    #[test]
    fn test_collapses_whitespace_and_newlines() {
        assert_eq!(clean("  Hello   world\n\n\nNew\tline  "), "Hello world New line");
    }

    #[test]
    fn test_strips_disallowed_characters() {
        assert_eq!(clean("Price: $5 (approx) & more; see #3"), "Price 5 approx  more see 3");
    }

    #[test]
    fn test_keeps_sentence_punctuation() {
        assert_eq!(clean("Wait, what? Yes! Well-known. Done."), "Wait, what? Yes! Well-known. Done.");
    }

    #[test]
    fn test_strip_runs_after_collapse() {
        assert_eq!(clean("one © two"), "one  two");
        assert_eq!(clean("one\n\n©\ttwo"), "one  two");
    }

    #[test]
    fn test_dashes_and_ellipsis_are_stripped_not_mapped() {
        assert_eq!(clean("one–two—three"), "onetwothree");
        assert_eq!(clean("Wait… what?"), "Wait what?");
        assert_eq!(clean("a\u{2011}b\u{2015}c"), "abc");
    }

    #[test]
    fn test_non_breaking_space_is_whitespace() {
        assert_eq!(clean("one\u{00a0}\u{00a0}two"), "one two");
    }

    #[test]
    fn test_drops_quotes() {
        assert_eq!(clean("\u{201c}Hello,\u{201d} she said. \"Bye.\""), "Hello, she said. Bye.");
    }

    #[test]
    fn test_keeps_unicode_letters() {
        assert_eq!(clean("Café über naïve."), "Café über naïve.");
    }

    #[test]
    fn test_zero_width_chars_removed() {
        assert_eq!(clean("Hello\u{200b}World\u{feff}"), "HelloWorld");
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert_eq!(clean(""), "");
        assert_eq!(clean(" \n\t "), "");
    }
}
