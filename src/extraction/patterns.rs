//! Text-matching rules for waypoints and mentioned places
//!
//! Two entry points: [`try_structured_route_patterns`] for explicit route
//! phrasing, and [`try_mention_extraction`] for prose that merely mentions
//! places. Both are pure and never fail; "no match" is an empty answer.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::models::Location;

/// Multi-word cities a lone first word is corrected to ("Los" -> "Los Angeles").
/// First entry wins when several share a first word.
const KNOWN_MULTIWORD_CITIES: &[&str] = &[
    "Los Angeles",
    "New York",
    "San Francisco",
    "San Diego",
    "Las Vegas",
    "New Orleans",
    "Salt Lake City",
    "Rio de Janeiro",
    "Buenos Aires",
    "Hong Kong",
    "Kuala Lumpur",
    "Tel Aviv",
    "Cape Town",
    "Mexico City",
    "Abu Dhabi",
    "Sao Paulo",
];

/// Leading words dropped from a waypoint candidate
const PREFIX_WORDS: &[&str] = &[
    "from",
    "route",
    "path",
    "directions",
    "direction",
    "walking",
    "walk",
    "driving",
    "drive",
    "cycling",
    "cycle",
    "biking",
    "bike",
    "go",
    "get",
    "travel",
    "fly",
    "navigate",
    "show",
    "me",
    "please",
    "i",
    "we",
    "want",
    "need",
    "would",
    "like",
    "lets",
    "let's",
    "can",
    "you",
];

/// Capitalized words that never start or form a place name on their own
const STOPWORDS: &[&str] = &[
    // pronouns
    "i", "me", "my", "we", "us", "our", "you", "your", "he", "him", "his", "she", "her", "it",
    "its", "they", "them", "their", "this", "that", "these", "those", "there", "here",
    // determiners and conjunctions
    "the", "a", "an", "some", "any", "each", "every", "all", "both", "and", "or", "but", "so",
    "if", "when", "while", "where", "what", "which", "who", "why", "how",
    // prepositions and sentence openers
    "in", "on", "at", "by", "for", "from", "to", "of", "with", "into", "during", "after",
    "before", "around", "circa", "between", "through", "later", "then", "today", "tomorrow",
    "yesterday", "however", "also", "next", "finally", "meanwhile", "afterwards", "please",
    "much", "many", "most", "more", "once", "now",
    "let", "lets", "let's", "show", "take", "go", "visit", "route", "directions",
    // weekdays
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    // months
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
    // numerals and era markers
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "first",
    "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
    "hundred", "thousand", "bc", "bce", "ad", "ce",
];

/// Lowercase-tolerant landmark and region names
const LANDMARKS: &[&str] = &[
    // continents
    "north america",
    "south america",
    "central america",
    "africa",
    "antarctica",
    "asia",
    "europe",
    "australia",
    "oceania",
    // oceans
    "atlantic ocean",
    "pacific ocean",
    "indian ocean",
    "arctic ocean",
    "southern ocean",
    // seas
    "mediterranean sea",
    "caribbean sea",
    "black sea",
    "red sea",
    "baltic sea",
    "north sea",
    "caspian sea",
    "dead sea",
    "aegean sea",
    "adriatic sea",
    // mountain ranges
    "alps",
    "andes",
    "himalayas",
    "rocky mountains",
    "pyrenees",
    "ural mountains",
    "appalachian mountains",
    "carpathian mountains",
    // regions
    "sahara",
    "amazon",
    "middle east",
    "scandinavia",
    "siberia",
    "balkans",
    "mesopotamia",
];

const MAX_BARE_SEGMENT_WORDS: usize = 5;

// Only leads the request, after optional filler ("show me the route from ...")
static ROUTE_LEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:please|can|could|you|show|give|find|get|me|us|the|a|best|fastest|quickest|shortest)\s+)*(?:route|path|directions?)\s+(?:from\s+)?(?P<rest>.+)$",
    )
    .expect("valid regex")
});

static FROM_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfrom\s+(?P<rest>.+)$").expect("valid regex"));

static FROM_TO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfrom\s+(?P<origin>.+?)\s+to\s+(?P<destination>.+)$").expect("valid regex")
});

static BETWEEN_AND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bbetween\s+(?P<first>.+?)\s+and\s+(?P<second>.+)$").expect("valid regex")
});

static FROM_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfrom\b").expect("valid regex"));

static TO_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+to\s+").expect("valid regex"));

static TRAILING_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:[,;(]|\s+(?:avoid(?:ing)?|without|no|by|via|using|with|please|on\s+foot|walking|cycling|biking|driving|and\s+(?:avoid|then|back))\b).*$",
    )
    .expect("valid regex")
});

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)|\n+").expect("valid regex"));

static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\p{Lu}[\p{L}'’-]*(?:\s+(?:(?:of|de|del|da|do|dos|du|la|le|upon|am)\s+)?\p{Lu}[\p{L}'’-]*)*",
    )
    .expect("valid regex")
});

static LANDMARK: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = LANDMARKS
        .iter()
        .map(|name| name.replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("valid regex")
});

const ERA: &str = r"(?:\s+(?:BC|BCE|AD|CE)\b)?";
const QUALIFIER: &str = r"(?:(?:early|late|mid)[\s-]+)?";
const ORDINAL_CENTURY: &str = r"(?:\d{1,2}(?:st|nd|rd|th)|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|eleventh|twelfth|thirteenth|fourteenth|fifteenth|sixteenth|seventeenth|eighteenth|nineteenth|twentieth|twenty-first)\s+century";

static TIME_AFTER_PREPOSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:in|during|around|circa)\s+(?:the\s+)?(?P<period>{QUALIFIER}(?:{ORDINAL_CENTURY}|\d{{3,4}}s?\b){ERA})"
    ))
    .expect("valid regex")
});

static BARE_CENTURY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?P<period>{QUALIFIER}{ORDINAL_CENTURY}{ERA})"))
        .expect("valid regex")
});

static FALLBACK_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["“”‘’«»`*_?!]+"#).expect("valid regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Byte range of a match within its sentence
type Span = (usize, usize);

type RouteRule = fn(&str) -> Option<Vec<String>>;

/// Route rules in priority order; the first to produce two or more names wins.
const ROUTE_RULES: &[(&str, RouteRule)] = &[
    ("explicit_route", explicit_route),
    ("from_to", from_to),
    ("between_and", between_and),
    ("bare_to", bare_to),
    ("split_on_to", split_on_to),
];

/// Try each route phrasing in fixed priority order.
///
/// Returns the ordered waypoint names of the first rule that yields at least
/// two non-empty names, or `None` when no rule applies.
#[must_use]
pub fn try_structured_route_patterns(text: &str) -> Option<Vec<String>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    ROUTE_RULES.iter().find_map(|(rule_name, rule)| {
        let waypoints = rule(text).filter(|w| w.len() >= 2)?;
        debug!("Route rule '{}' matched: {:?}", rule_name, waypoints);
        Some(waypoints)
    })
}

/// Places mentioned in free prose, in order of appearance.
///
/// A time expression belongs to the nearest place before it in the same
/// sentence, or to the place right after it when it opens the sentence.
#[must_use]
pub fn try_mention_extraction(text: &str) -> Vec<Location> {
    let mut seen = HashSet::new();
    let mut locations = Vec::new();

    for sentence in SENTENCE_BREAK.split(text) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        let periods = time_expressions(sentence);
        let places = places_in_sentence(sentence, &periods);
        let contexts = attach_time_context(&places, &periods);

        for ((_, name), time_context) in places.into_iter().zip(contexts) {
            if seen.insert(name.to_lowercase()) {
                locations.push(Location::with_time_context(name, time_context));
            }
        }
    }

    debug!("Mention extraction found {} locations", locations.len());
    locations
}

/// Light normalization applied before the regex fallback stage: drops quotes
/// and emphasis characters and collapses whitespace.
#[must_use]
pub fn normalize_for_fallback(text: &str) -> String {
    let stripped = FALLBACK_NOISE.replace_all(text, " ");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// First time period mentioned in a sentence ("5th century", "1492", ...)
#[must_use]
pub fn find_time_context(sentence: &str) -> Option<String> {
    time_expressions(sentence)
        .into_iter()
        .next()
        .map(|(_, period)| period)
}

/// Time expressions of a sentence with their spans, ordered by position.
/// A span covers the leading preposition too.
fn time_expressions(sentence: &str) -> Vec<(Span, String)> {
    let mut found: Vec<(Span, String)> = TIME_AFTER_PREPOSITION
        .captures_iter(sentence)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let period = c.name("period")?;
            Some(((whole.start(), whole.end()), period.as_str().trim().to_string()))
        })
        .collect();

    for c in BARE_CENTURY.captures_iter(sentence) {
        let Some(period) = c.name("period") else {
            continue;
        };
        let span = (period.start(), period.end());
        if !found.iter().any(|(other, _)| overlaps(*other, span)) {
            found.push((span, period.as_str().trim().to_string()));
        }
    }

    found.sort_by_key(|((start, _), _)| *start);
    found
}

/// One time context per place: each expression goes to the closest place
/// ending before it, else to the first place after it.
fn attach_time_context(places: &[(Span, String)], periods: &[(Span, String)]) -> Vec<String> {
    let mut contexts = vec![String::new(); places.len()];

    for ((start, end), period) in periods {
        let target = places
            .iter()
            .rposition(|((_, place_end), _)| place_end <= start)
            .or_else(|| {
                places
                    .iter()
                    .position(|((place_start, _), _)| place_start >= end)
            });
        if let Some(i) = target.filter(|&i| contexts[i].is_empty()) {
            contexts[i] = period.clone();
        }
    }

    contexts
}

fn overlaps(a: Span, b: Span) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// Replace a lone first word of a known multi-word city with the full name.
#[must_use]
pub fn correct_city_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.contains(char::is_whitespace) {
        return trimmed.to_string();
    }

    KNOWN_MULTIWORD_CITIES
        .iter()
        .find(|city| {
            city.split_whitespace()
                .next()
                .is_some_and(|first| first.eq_ignore_ascii_case(trimmed))
        })
        .map_or_else(|| trimmed.to_string(), |city| (*city).to_string())
}

// (a) "route from A to B to C", or "from A to B to C" with two or more "to"
fn explicit_route(text: &str) -> Option<Vec<String>> {
    if let Some(captures) = ROUTE_LEAD.captures(text) {
        return split_waypoints(&captures["rest"], 2);
    }

    let captures = FROM_CLAUSE.captures(text)?;
    split_waypoints(&captures["rest"], 3)
}

// (b) "from A to B": the first "to" after "from" ends the origin
fn from_to(text: &str) -> Option<Vec<String>> {
    let captures = FROM_TO.captures(text)?;
    all_cleaned(&[&captures["origin"], &captures["destination"]])
}

// (c) "between A and B"
fn between_and(text: &str) -> Option<Vec<String>> {
    let captures = BETWEEN_AND.captures(text)?;
    all_cleaned(&[&captures["first"], &captures["second"]])
}

// (d) "A to B" with a single "to" and no "from"
fn bare_to(text: &str) -> Option<Vec<String>> {
    if FROM_WORD.is_match(text) || TO_SEPARATOR.find_iter(text).count() != 1 {
        return None;
    }

    let segments: Vec<&str> = TO_SEPARATOR.split(text).collect();
    let waypoints = all_cleaned(&segments)?;
    waypoints
        .iter()
        .all(|w| w.split_whitespace().count() <= MAX_BARE_SEGMENT_WORDS)
        .then_some(waypoints)
}

// (e) last resort: segments emptied by prefix stripping are dropped, every
// remaining one must look like a place name
fn split_on_to(text: &str) -> Option<Vec<String>> {
    let waypoints: Vec<String> = TO_SEPARATOR
        .split(text)
        .filter_map(clean_waypoint)
        .collect();
    if waypoints.len() < 2 {
        return None;
    }

    waypoints
        .iter()
        .all(|w| {
            w.split_whitespace().count() <= MAX_BARE_SEGMENT_WORDS
                && w.chars()
                    .next()
                    .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
        })
        .then_some(waypoints)
}

fn split_waypoints(rest: &str, min_segments: usize) -> Option<Vec<String>> {
    let segments: Vec<&str> = TO_SEPARATOR.split(rest).collect();
    if segments.len() < min_segments {
        return None;
    }
    all_cleaned(&segments)
}

/// Clean every segment; the rule is skipped if any segment ends up empty.
fn all_cleaned(segments: &[&str]) -> Option<Vec<String>> {
    segments
        .iter()
        .map(|segment| clean_waypoint(segment))
        .collect()
}

fn clean_waypoint(raw: &str) -> Option<String> {
    let without_qualifiers = TRAILING_QUALIFIER.replace(raw, "");
    let without_prefix = strip_prefix_words(&without_qualifiers);
    let trimmed = trim_punctuation(without_prefix);
    if trimmed.is_empty() || !trimmed.chars().any(char::is_alphanumeric) {
        return None;
    }
    Some(correct_city_name(trimmed))
}

fn strip_prefix_words(text: &str) -> &str {
    let mut rest = text.trim_start();
    loop {
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let word = trim_punctuation(&rest[..word_end]);
        if word.is_empty() || !PREFIX_WORDS.iter().any(|p| p.eq_ignore_ascii_case(word)) {
            return rest;
        }
        rest = rest[word_end..].trim_start();
    }
}

fn trim_punctuation(text: &str) -> &str {
    text.trim_matches(|c: char| {
        c.is_whitespace()
            || matches!(
                c,
                '.' | ',' | '!' | '?' | ';' | ':' | '"' | '\'' | '“' | '”' | '‘' | '’' | '(' | ')'
                    | '*' | '_' | '`'
            )
    })
}

fn is_stopword(word: &str) -> bool {
    let word = word.trim_end_matches(['\'', '’']).to_lowercase();
    STOPWORDS.contains(&word.as_str())
}

/// Place-name candidates of one sentence, ordered by position. Where a
/// capitalized run and a landmark overlap, the longer span wins; nothing
/// inside a time expression counts.
fn places_in_sentence(sentence: &str, periods: &[(Span, String)]) -> Vec<(Span, String)> {
    let mut candidates: Vec<(usize, usize, String)> = Vec::new();

    for m in CAPITALIZED_RUN.find_iter(sentence) {
        if let Some((offset, name)) = strip_stopwords(m.as_str()) {
            candidates.push((m.start() + offset, m.end(), name));
        }
    }

    for m in LANDMARK.find_iter(sentence) {
        candidates.push((m.start(), m.end(), title_case(m.as_str())));
    }

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then((b.1 - b.0).cmp(&(a.1 - a.0))));

    let mut accepted: Vec<(usize, usize, String)> = Vec::new();
    for candidate in candidates {
        let span = (candidate.0, candidate.1);
        let taken = accepted
            .iter()
            .any(|(start, end, _)| overlaps((*start, *end), span))
            || periods.iter().any(|(period, _)| overlaps(*period, span));
        if !taken {
            accepted.push(candidate);
        }
    }

    accepted
        .into_iter()
        .map(|(start, end, name)| ((start, end), name))
        .collect()
}

/// Drop leading stopwords and a trailing possessive from a capitalized run.
/// Returns the byte offset of the kept part and the cleaned name.
fn strip_stopwords(run: &str) -> Option<(usize, String)> {
    let mut offset = 0;
    let mut rest = run;
    while let Some(word) = rest.split_whitespace().next() {
        if !is_stopword(word) {
            break;
        }
        let skipped = rest.len() - rest[word.len()..].trim_start().len();
        offset += skipped;
        rest = &rest[skipped..];
    }

    let name = rest
        .trim()
        .trim_end_matches("'s")
        .trim_end_matches("’s")
        .trim_end_matches(['\'', '’', '-']);
    let all_stop = name.split_whitespace().all(is_stopword);
    if name.is_empty() || all_stop {
        return None;
    }
    Some((offset, name.to_string()))
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
