//! Keyword scan for travel mode and avoidance preferences

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Preferences, TransportMode};

static WALKING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:walk(?:ing)?|on foot)\b").expect("valid regex"));

static CYCLING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:cycl(?:e|ing)|bike|biking|bicycle)\b").expect("valid regex")
});

// Features that may be listed between an avoidance verb and its object
// ("avoid tolls, highways and ferries").
const AVOIDABLE: &str = r"(?:toll(?:s|\s+roads?)?|highways?|freeways?|motorways?|ferr(?:y|ies))";

static AVOID_TOLLS: LazyLock<Regex> = LazyLock::new(|| avoidance(r"tolls?"));

static AVOID_HIGHWAYS: LazyLock<Regex> = LazyLock::new(|| avoidance(r"(?:highways?|freeways?)"));

static AVOID_FERRIES: LazyLock<Regex> = LazyLock::new(|| avoidance(r"ferr(?:y|ies)"));

fn avoidance(object: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)\b(?:no|avoid(?:ing)?|without)\s+(?:(?:any|the)\s+)?(?:{AVOIDABLE}(?:\s*,\s*|\s+)(?:(?:and|or)\s+)?)*{object}\b"
    ))
    .expect("valid regex")
}

/// Transport mode stated in the text, if any. Walking wins over cycling.
///
/// Transit is never detected here; only the language model can produce it.
#[must_use]
pub fn detect_transport_mode(text: &str) -> Option<TransportMode> {
    if WALKING.is_match(text) {
        Some(TransportMode::Walking)
    } else if CYCLING.is_match(text) {
        Some(TransportMode::Cycling)
    } else {
        None
    }
}

/// Scan raw text for travel preferences. Never fails; unset fields keep
/// their defaults.
#[must_use]
pub fn extract_preferences(text: &str) -> Preferences {
    Preferences {
        transport_mode: detect_transport_mode(text).unwrap_or_default(),
        avoid_tolls: AVOID_TOLLS.is_match(text),
        avoid_highways: AVOID_HIGHWAYS.is_match(text),
        avoid_ferries: AVOID_FERRIES.is_match(text),
    }
}
