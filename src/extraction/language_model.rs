//! Asks a language model to read the query and normalizes whatever it answers

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use super::json_repair::parse_json_object;
use crate::llm::{Completion, CompletionRequest, FunctionSchema, LanguageModel};
use crate::models::{ExtractionParts, ExtractionResult, Location, Preferences, TransportMode};
use crate::{Result, WayfinderError};

pub const EXTRACTION_FUNCTION: &str = "extract_locations";

const SYSTEM_PROMPT: &str = "You extract places and travel preferences from requests typed into a map \
application. Answer with a single JSON object only. Do not add explanations, \
markdown or any text before or after the JSON.";

const INSTRUCTIONS: &str = r#"Read the request and return a JSON object with these fields:
- "isRouteRequest": true when the user wants to travel between places in order, false when places are only mentioned
- "locations": array of {"name": string, "timeContext": string}; timeContext is the time expression tied to the place or ""
- "travelMode": one of "driving", "walking", "cycling", "transit"
- "preferences": array of short strings such as "avoid tolls"
- "message": one short sentence for the user describing what will be shown
- "suggestedSequence": the location names in the order they should be displayed

Examples:

Request: "from Paris to London"
{"isRouteRequest": true, "locations": [{"name": "Paris", "timeContext": ""}, {"name": "London", "timeContext": ""}], "travelMode": "driving", "preferences": [], "message": "Route from Paris to London.", "suggestedSequence": ["Paris", "London"]}

Request: "bike from Amsterdam to Utrecht without ferries"
{"isRouteRequest": true, "locations": [{"name": "Amsterdam", "timeContext": ""}, {"name": "Utrecht", "timeContext": ""}], "travelMode": "cycling", "preferences": ["avoid ferries"], "message": "Cycling route from Amsterdam to Utrecht avoiding ferries.", "suggestedSequence": ["Amsterdam", "Utrecht"]}

Request: "The Vikings sailed from Norway and settled in Iceland around 870."
{"isRouteRequest": false, "locations": [{"name": "Norway", "timeContext": ""}, {"name": "Iceland", "timeContext": "around 870"}], "travelMode": "driving", "preferences": [], "message": "Showing 2 places mentioned in the text.", "suggestedSequence": ["Norway", "Iceland"]}"#;

/// Turns one query into an extraction using a language model.
///
/// One model request per call. Retry and timeout policy belong to the caller.
pub struct LanguageModelExtractor {
    model: Arc<dyn LanguageModel>,
    use_function_calling: bool,
}

impl LanguageModelExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, use_function_calling: bool) -> Self {
        Self {
            model,
            use_function_calling,
        }
    }

    /// Request for `text`. Identical input always yields an identical request.
    #[must_use]
    pub fn build_request(&self, text: &str) -> CompletionRequest {
        let prompt = format!("{INSTRUCTIONS}\n\nRequest: {}\n", json!(text));
        CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            function: self.use_function_calling.then(extraction_schema),
        }
    }

    #[instrument(skip(self))]
    pub async fn extract(&self, text: &str) -> Result<ExtractionResult> {
        let completion = self.model.complete(&self.build_request(text)).await?;
        let value = parse_completion(completion)?;
        let parts = normalize_response(&value)?;
        debug!(
            "Language model found {} location(s), route: {}",
            parts.locations.len(),
            parts.is_route_request
        );
        Ok(ExtractionResult::assemble(parts))
    }
}

/// Arguments schema for the `extract_locations` function
#[must_use]
pub fn extraction_schema() -> FunctionSchema {
    FunctionSchema {
        name: EXTRACTION_FUNCTION.to_string(),
        description: "Extract the places, route intent and travel preferences from a map request"
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "isRouteRequest": { "type": "boolean" },
                "locations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "timeContext": { "type": "string" }
                        },
                        "required": ["name"]
                    }
                },
                "travelMode": {
                    "type": "string",
                    "enum": ["driving", "walking", "cycling", "transit"]
                },
                "preferences": { "type": "array", "items": { "type": "string" } },
                "message": { "type": "string" },
                "suggestedSequence": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["isRouteRequest", "locations"]
        }),
    }
}

/// JSON object carried by a completion, whichever shape it came in
pub fn parse_completion(completion: Completion) -> Result<Value> {
    match completion {
        Completion::FunctionCall { name, arguments } if name == EXTRACTION_FUNCTION => {
            match arguments {
                Value::Object(_) => Ok(arguments),
                Value::String(raw) => parse_json_object(&raw),
                other => Err(WayfinderError::extraction(format!(
                    "function arguments are not an object: {other}"
                ))),
            }
        }
        Completion::FunctionCall { name, .. } => Err(WayfinderError::extraction(format!(
            "model called unexpected function '{name}'"
        ))),
        Completion::Text(text) => parse_json_object(&text),
    }
}

/// Lenient reading of the model's object into extraction parts.
///
/// Accepts camelCase and snake_case keys, bare-string locations and missing
/// fields. Unknown travel modes fall back to driving.
pub fn normalize_response(value: &Value) -> Result<ExtractionParts> {
    let object = value
        .as_object()
        .ok_or_else(|| WayfinderError::extraction("model response is not a JSON object"))?;

    let locations: Vec<Location> = field(object, &["locations", "places"])
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(location_from_value).collect())
        .unwrap_or_default();

    let travel_mode = field(object, &["travelMode", "travel_mode", "transportMode"])
        .and_then(Value::as_str)
        .map(TransportMode::from_token)
        .unwrap_or_default();

    let is_route_request = match field(object, &["isRouteRequest", "is_route_request"]) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };

    let preferences = match field(object, &["preferences"]) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(value) => string_list(value),
        None => Vec::new(),
    };

    let message = field(object, &["message"])
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let suggested_sequence =
        field(object, &["suggestedSequence", "suggested_sequence"]).map(string_list);

    Ok(ExtractionParts {
        is_route_request,
        locations,
        travel_mode,
        preferences,
        message,
        suggested_sequence,
        route_preferences: Preferences {
            transport_mode: travel_mode,
            ..Preferences::default()
        },
    })
}

fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .filter(|value| !value.is_null())
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn location_from_value(value: &Value) -> Option<Location> {
    match value {
        Value::String(name) if !name.trim().is_empty() => Some(Location::new(name.as_str())),
        Value::Object(entry) => {
            let name = field(entry, &["name"])?.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            let time_context = field(entry, &["timeContext", "time_context", "time"])
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(Location::with_time_context(name, time_context.trim()))
        }
        _ => None,
    }
}
