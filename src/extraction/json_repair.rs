//! Recovering a JSON object from free-form model output
//!
//! Models wrap JSON in markdown fences, add prose around it, or emit smart
//! quotes and trailing commas. Attempts run in order: fenced block, first
//! balanced `{...}` span, then the same span after tryparse's repair pass.

use std::sync::LazyLock;

use serde_json::Value;
use tracing::debug;
use tryparse::parser::strategies::{JsonFixerStrategy, MarkdownStrategy, ParsingStrategy};

use crate::WayfinderError;

static FENCED: LazyLock<MarkdownStrategy> = LazyLock::new(MarkdownStrategy::default);

static FIXER: LazyLock<JsonFixerStrategy> = LazyLock::new(JsonFixerStrategy::default);

/// Parse the first JSON object found in `text`.
pub fn parse_json_object(text: &str) -> Result<Value, WayfinderError> {
    if let Some(value) = first_object(&*FENCED, text) {
        return Ok(value);
    }

    let span = find_object_span(text)
        .ok_or_else(|| WayfinderError::extraction("no JSON object found in model response"))?;

    match serde_json::from_str::<Value>(span) {
        Ok(value) if value.is_object() => return Ok(value),
        Ok(_) => {}
        Err(e) => debug!("Object span did not parse, repairing: {}", e),
    }

    first_object(&*FIXER, span)
        .ok_or_else(|| WayfinderError::extraction("model response is not repairable JSON"))
}

/// First candidate of a tryparse strategy that is a JSON object
fn first_object(strategy: &dyn ParsingStrategy, text: &str) -> Option<Value> {
    match strategy.parse(text) {
        Ok(candidates) => candidates
            .into_iter()
            .map(|candidate| candidate.value)
            .find(Value::is_object),
        Err(e) => {
            debug!("{} found nothing: {}", strategy.name(), e);
            None
        }
    }
}

/// Span of the first balanced `{...}` object, ignoring braces inside strings
#[must_use]
pub fn find_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escape_next => escape_next = false,
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        let value = parse_json_object(r#"{"isRouteRequest": true}"#).unwrap();
        assert_eq!(value["isRouteRequest"], true);
    }

    #[test]
    fn test_fenced_json_with_prose() {
        let text = "Here you go:\n```json\n{\"locations\": [\"Paris\"]}\n```\nHope that helps!";
        let value = parse_json_object(text).unwrap();
        assert_eq!(value["locations"][0], "Paris");
    }

    #[test]
    fn test_untagged_fence() {
        let text = "```\n{\"message\": \"ok\"}\n```";
        assert_eq!(parse_json_object(text).unwrap()["message"], "ok");
    }

    #[test]
    fn test_non_json_fence_is_skipped() {
        let text = "```python\nprint('hi')\n```\n{\"message\": \"ok\"}";
        assert_eq!(parse_json_object(text).unwrap()["message"], "ok");
    }

    #[test]
    fn test_object_span_inside_prose() {
        let text = "Sure! The answer is {\"travelMode\": \"walking\"} as requested.";
        assert_eq!(parse_json_object(text).unwrap()["travelMode"], "walking");
    }

    #[test]
    fn test_first_of_several_objects_wins() {
        let text = r#"{"locations": ["Oslo"]} or alternatively {"locations": ["Bergen"]}"#;
        assert_eq!(
            find_object_span(text),
            Some(r#"{"locations": ["Oslo"]}"#)
        );
        assert_eq!(parse_json_object(text).unwrap()["locations"][0], "Oslo");
    }

    #[test]
    fn test_span_skips_braces_in_strings() {
        let text = r#"note: {"message": "a,} {b", "nested": {"x": 1}} trailing }"#;
        assert_eq!(
            find_object_span(text),
            Some(r#"{"message": "a,} {b", "nested": {"x": 1}}"#)
        );
        assert_eq!(parse_json_object(text).unwrap()["message"], "a,} {b");
    }

    #[test]
    fn test_span_after_non_ascii_prose() {
        let text = "Voilà → {\"locations\": [\"São Paulo\"]} ✓";
        assert_eq!(parse_json_object(text).unwrap()["locations"][0], "São Paulo");
    }

    #[test]
    fn test_smart_quotes_repaired() {
        let text = "{“locations”: [“Rome”,\n “Milan”],\n “message”: “ok”}";
        let value = parse_json_object(text).unwrap();
        assert_eq!(value["locations"][1], "Milan");
    }

    #[test]
    fn test_trailing_commas_repaired() {
        let text = "{\"locations\": [\"Rome\", \"Milan\",],}";
        let value = parse_json_object(text).unwrap();
        assert_eq!(value["locations"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_unbalanced_object_has_no_span() {
        assert_eq!(find_object_span("{\"locations\": [\"Rome\""), None);
    }

    #[test]
    fn test_no_json_fails() {
        let err = parse_json_object("I could not find any places.").unwrap_err();
        assert!(matches!(err, WayfinderError::ExtractionFailure { .. }));
    }

    #[test]
    fn test_array_is_not_an_object() {
        assert!(parse_json_object("[1, 2, 3]").is_err());
    }
}
