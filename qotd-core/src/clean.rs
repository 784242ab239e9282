//! Preamble stripping for raw model output.
//!
//! Models like to open with "Here's a quote about ..." or "Sure!" before the
//! actual quote. [`clean`] drops those lines and flattens the rest into a
//! single whitespace-normalised line ready for [`crate::extract::extract`].

use regex::Regex;
use std::sync::OnceLock;

fn preamble() -> &'static Regex {
    static PREAMBLE: OnceLock<Regex> = OnceLock::new();
    PREAMBLE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:here(?:'|’|â€™)?s\b|here is\b|this is\b|daily quote|category|sure[,.]|of course[,.])",
        )
        .expect("preamble pattern is valid")
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_once(raw: &str) -> String {
    let kept: Vec<String> = raw
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !preamble().is_match(line))
        .collect();

    collapse_whitespace(&kept.join(" "))
}

/// Remove preamble lines and collapse the remainder into one line.
///
/// Never fails; all-preamble input yields an empty string.
pub fn clean(raw: &str) -> String {
    let mut current = clean_once(raw);
    // Joining lines can surface a preamble at the start of the text.
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
