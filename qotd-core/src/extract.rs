//! Quote/author extraction from free-form model output.
//!
//! The model is asked for `"Quote text." - Author`, but nothing guarantees the
//! shape of what comes back. [`extract`] is a best-effort heuristic: it splits
//! on the last dash separator and falls back to [`UNKNOWN_AUTHOR`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Author used when no attribution can be recovered.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

const QUOTE_MARKS: &[char] = &['"', '“', '”', '\'', '‘', '’', '[', ']'];

/// A quote split from its attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedQuote {
    pub quote: String,
    pub author: String,
}

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\s+[-—]\s+").expect("separator pattern is valid"))
}

fn strip_marks(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || QUOTE_MARKS.contains(&c))
}

fn strip_quote(text: &str) -> String {
    let inner = strip_marks(text).trim_end_matches(['.', ',']);
    strip_marks(inner).to_string()
}

fn author_or_unknown(text: &str) -> String {
    let author = strip_marks(text);
    if author.is_empty() {
        UNKNOWN_AUTHOR.to_string()
    } else {
        author.to_string()
    }
}

/// Split `text` into quote and author.
///
/// The last separator wins, so dashes inside the quote survive:
/// `"A - B - C"` gives quote `A - B` and author `C`.
pub fn extract(text: &str) -> ExtractedQuote {
    let trimmed = text.trim();

    let Some(last) = separator().find_iter(trimmed).last() else {
        return ExtractedQuote {
            quote: strip_quote(trimmed),
            author: UNKNOWN_AUTHOR.to_string(),
        };
    };

    let head = separator()
        .split(&trimmed[..last.start()])
        .collect::<Vec<_>>()
        .join(" - ");

    ExtractedQuote {
        quote: strip_quote(&head),
        author: author_or_unknown(&trimmed[last.end()..]),
    }
}

fn normalize(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key under which two quotes count as the same entry.
///
/// Case, punctuation and spacing are ignored.
pub fn dedup_key(quote: &str, author: &str) -> String {
    format!("{}|{}", normalize(quote), normalize(author))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(text: &str) -> (String, String) {
        let extracted = extract(text);
        (extracted.quote, extracted.author)
    }

    #[test]
    fn test_quoted_text_with_author() {
        assert_eq!(
            parts("\"Knowledge is power.\" - Francis Bacon"),
            ("Knowledge is power".to_string(), "Francis Bacon".to_string())
        );
    }

    #[test]
    fn test_stray_trailing_quote_on_author() {
        assert_eq!(
            parts("\"Be yourself; everyone else is already taken.\" - Oscar Wilde\""),
            (
                "Be yourself; everyone else is already taken".to_string(),
                "Oscar Wilde".to_string()
            )
        );
    }

    #[test]
    fn test_em_dash_and_curly_quotes() {
        assert_eq!(
            parts("“The unexamined life is not worth living.” — Socrates"),
            (
                "The unexamined life is not worth living".to_string(),
                "Socrates".to_string()
            )
        );
    }

    #[test]
    fn test_last_separator_wins() {
        assert_eq!(
            parts("Work - it is the rent we pay - for living - Unknown Poet"),
            (
                "Work - it is the rent we pay - for living".to_string(),
                "Unknown Poet".to_string()
            )
        );
    }

    #[test]
    fn test_earlier_separators_rejoined_with_plain_dash() {
        assert_eq!(
            parts("First — then second - Author"),
            ("First - then second".to_string(), "Author".to_string())
        );
    }

    #[test]
    fn test_hyphenated_words_are_not_separators() {
        assert_eq!(
            parts("Self-reliance is the well-spring of courage - Ralph Waldo Emerson"),
            (
                "Self-reliance is the well-spring of courage".to_string(),
                "Ralph Waldo Emerson".to_string()
            )
        );
    }

    #[test]
    fn test_brackets_stripped_from_author() {
        assert_eq!(parts("Carpe diem. - [Horace]").1, "Horace");
    }

    #[test]
    fn test_no_separator() {
        assert_eq!(
            parts("no separator present"),
            ("no separator present".to_string(), "Unknown".to_string())
        );
    }

    #[test]
    fn test_empty_author_falls_back() {
        assert_eq!(parts("Something wise - \"\"").1, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_total_on_odd_input() {
        for input in ["", " ", "-", " - ", "—", "\"\"", "- - -", "a -", "\n - \n", "ü — é"] {
            let extracted = extract(input);
            assert!(!extracted.author.is_empty(), "input: {input:?}");
        }
        assert_eq!(parts(""), (String::new(), UNKNOWN_AUTHOR.to_string()));
    }

    #[test]
    fn test_dedup_key_ignores_case_spacing_punctuation() {
        assert_eq!(
            dedup_key("Knowledge is power.", "Francis Bacon"),
            dedup_key("  knowledge   IS power ", "francis bacon.")
        );
        assert_ne!(
            dedup_key("Knowledge is power", "Francis Bacon"),
            dedup_key("Knowledge is power", "Thomas Hobbes")
        );
    }
}
