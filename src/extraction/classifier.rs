//! Route-or-mention decision from surface cues

use std::sync::LazyLock;

use regex::Regex;

static STANDALONE_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\sto\s").expect("valid regex"));

/// Whether the text asks for a route.
///
/// True when more than one location was found, the text starts with
/// "from ", or it contains the word "to" surrounded by whitespace. Always
/// pass the user's original text: normalization can strip the very cue
/// this depends on.
#[must_use]
pub fn classify(text: &str, extracted_location_count: usize) -> bool {
    extracted_location_count > 1
        || text.trim_start().to_lowercase().starts_with("from ")
        || STANDALONE_TO.is_match(text)
}
