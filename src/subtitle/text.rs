//! Text hygiene shared by the merger, the codec and the synthesis builder.

use regex::Regex;
use std::sync::LazyLock;

/// Repeated leading list markers: "6.", "(6)", "6)", "- ", "– ", "— ", "• ", "* ".
static ENUMERATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\(?\d{1,3}\)?[.)\-–—:]\s*|[•*\-–—]\s*)+").expect("Invalid regex")
});

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upper-case the first character, leaving the rest untouched.
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if !first.is_uppercase() => first.to_uppercase().chain(chars).collect(),
        _ => text.to_string(),
    }
}

/// Normalize an assembled sentence: single spaces, capitalised start.
pub fn clean_sentence(text: &str) -> String {
    capitalize_first(&collapse_whitespace(text))
}

/// Remove leading enumeration or bullet markers before speech synthesis.
///
/// Numbers inside the sentence are kept.
pub fn strip_enumeration(text: &str) -> String {
    ENUMERATION_RE.replace(text.trim(), "").trim().to_string()
}

/// True for text made only of digits, such as a stray subtitle index.
pub fn is_numeric_only(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_numeric)
}

/// Strip markdown fences and chatter that language models wrap around
/// subtitle documents.
pub fn clean_ai_response(response: &str) -> String {
    let mut body = response.trim();

    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string ("srt", "text", ...) on the fence line
        body = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => "",
        };
    }
    body = body.trim_end();
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }

    let lines: Vec<&str> = body
        .lines()
        .map(str::trim)
        .skip_while(|line| line.parse::<usize>().is_err())
        .collect();

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("  one two\tthree\nfour "), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_clean_sentence() {
        assert_eq!(clean_sentence("  hello    there  world "), "Hello there world");
        assert_eq!(clean_sentence("émile said"), "Émile said");
        assert_eq!(clean_sentence(""), "");
    }

    #[test]
    fn test_strip_enumeration() {
        assert_eq!(strip_enumeration("6. Then we left."), "Then we left.");
        assert_eq!(strip_enumeration("(6) Then we left."), "Then we left.");
        assert_eq!(strip_enumeration("6) Then we left."), "Then we left.");
        assert_eq!(strip_enumeration("- • Then we left."), "Then we left.");
        assert_eq!(strip_enumeration("— Then we left."), "Then we left.");
        assert_eq!(
            strip_enumeration("We bought 12 apples."),
            "We bought 12 apples."
        );
    }

    #[test]
    fn test_strip_enumeration_can_empty_text() {
        assert_eq!(strip_enumeration("12."), "");
        assert_eq!(strip_enumeration("  - "), "");
    }

    #[test]
    fn test_is_numeric_only() {
        assert!(is_numeric_only("42"));
        assert!(!is_numeric_only("42 apples"));
        assert!(!is_numeric_only(""));
    }

    #[test]
    fn test_clean_ai_response_strips_fences() {
        let response = "```srt\n1\n00:00:00,000 --> 00:00:01,000\nXin chào\n```";
        assert_eq!(
            clean_ai_response(response),
            "1\n00:00:00,000 --> 00:00:01,000\nXin chào"
        );
    }

    #[test]
    fn test_clean_ai_response_drops_leading_chatter() {
        let response = "Here is the translated file:\n\n1\n00:00:00,000 --> 00:00:01,000\nHola";
        assert_eq!(
            clean_ai_response(response),
            "1\n00:00:00,000 --> 00:00:01,000\nHola"
        );
    }
}
