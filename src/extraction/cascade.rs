//! Ordered extraction strategies: patterns, language model, regex fallback

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use super::classifier::classify;
use super::language_model::LanguageModelExtractor;
use super::patterns::{normalize_for_fallback, try_mention_extraction, try_structured_route_patterns};
use super::preferences::{detect_transport_mode, extract_preferences};
use crate::WayfinderError;
use crate::llm::LanguageModel;
use crate::models::{ExtractionParts, ExtractionResult, Location, Preferences, TransportMode};

pub const NOTHING_FOUND_MESSAGE: &str = "I couldn't find any locations in your request. \
Please be more specific, e.g. \"from Paris to London\".";

/// Entry point of the extraction pipeline.
///
/// Stage 0 matches explicit route phrasing without any network call. Stage 1
/// asks the language model, bounded by the caller's timeout. Stage 2 reruns
/// the patterns on normalized text and falls back to mention extraction.
/// Stage 3 returns an empty result asking the user to be more specific.
pub struct LocationExtractor {
    language_model: Option<LanguageModelExtractor>,
}

impl LocationExtractor {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, use_function_calling: bool) -> Self {
        Self {
            language_model: model.map(|m| LanguageModelExtractor::new(m, use_function_calling)),
        }
    }

    /// Extractor that never calls a language model
    pub fn offline() -> Self {
        Self {
            language_model: None,
        }
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.language_model.is_none()
    }

    /// Interpret `raw_text` as a route or a set of mentioned places.
    ///
    /// Never fails: every collaborator failure degrades to the next stage.
    #[instrument(skip(self, raw_text), fields(text_len = raw_text.len()))]
    pub async fn extract_locations_and_preferences(
        &self,
        raw_text: &str,
        timeout: Duration,
    ) -> ExtractionResult {
        let preferences = extract_preferences(raw_text);
        let stated_mode = detect_transport_mode(raw_text);

        if let Some(waypoints) = try_structured_route_patterns(raw_text) {
            debug!("Stage 0: route patterns matched {} waypoints", waypoints.len());
            return route_result(waypoints, preferences);
        }

        if raw_text.trim().is_empty() {
            debug!("Blank input, nothing to extract");
            return ExtractionResult::empty(NOTHING_FOUND_MESSAGE, preferences);
        }

        if let Some(extractor) = &self.language_model {
            match run_with_timeout(extractor, raw_text, timeout).await {
                Ok(result) if !result.locations.is_empty() => {
                    debug!("Stage 1: language model found {} locations", result.locations.len());
                    return merge_model_result(result, preferences, stated_mode);
                }
                Ok(_) => debug!("Stage 1: language model found no locations, trying fallback"),
                Err(e) if e.is_recoverable_extraction() => {
                    warn!("Stage 1 failed, falling back to patterns: {}", e);
                }
                Err(e) => error!("Language model unusable, falling back to patterns: {}", e),
            }
        }

        let normalized = normalize_for_fallback(raw_text);

        if let Some(waypoints) = try_structured_route_patterns(&normalized) {
            debug!("Stage 2: route patterns matched {} waypoints", waypoints.len());
            return route_result(waypoints, preferences);
        }

        let mentions = try_mention_extraction(&normalized);
        if !mentions.is_empty() {
            debug!("Stage 2: mention extraction found {} locations", mentions.len());
            let is_route_request = mentions_form_route(raw_text, &mentions);
            return fallback_result(mentions, is_route_request, preferences);
        }

        info!("No locations found in request");
        ExtractionResult::empty(NOTHING_FOUND_MESSAGE, preferences)
    }
}

async fn run_with_timeout(
    extractor: &LanguageModelExtractor,
    raw_text: &str,
    timeout: Duration,
) -> crate::Result<ExtractionResult> {
    tokio::time::timeout(timeout, extractor.extract(raw_text))
        .await
        .map_err(|_| WayfinderError::TimeoutExceeded {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })?
}

/// Two or more mentions form a route unless a time period anchors them,
/// which reads as history rather than a trip.
fn mentions_form_route(raw_text: &str, mentions: &[Location]) -> bool {
    mentions.iter().all(|l| l.time_context.is_empty()) && classify(raw_text, mentions.len())
}

fn route_result(waypoints: Vec<String>, preferences: Preferences) -> ExtractionResult {
    let message = format!("Route: {}", waypoints.join(" → "));
    ExtractionResult::assemble(ExtractionParts {
        is_route_request: true,
        locations: waypoints.into_iter().map(Location::new).collect(),
        travel_mode: preferences.transport_mode,
        preferences: preferences.descriptions(),
        message,
        suggested_sequence: None,
        route_preferences: preferences,
    })
}

fn fallback_result(
    locations: Vec<Location>,
    is_route_request: bool,
    preferences: Preferences,
) -> ExtractionResult {
    with_summary(ExtractionResult::assemble(ExtractionParts {
        is_route_request,
        locations,
        travel_mode: preferences.transport_mode,
        preferences: preferences.descriptions(),
        message: String::new(),
        suggested_sequence: None,
        route_preferences: preferences,
    }))
}

/// Avoidance flags always come from the keyword scan; the travel mode comes
/// from the scan when the text states one, otherwise from the model.
fn merge_model_result(
    result: ExtractionResult,
    scanned: Preferences,
    stated_mode: Option<TransportMode>,
) -> ExtractionResult {
    let travel_mode = stated_mode.unwrap_or(result.travel_mode);
    let route_preferences = Preferences {
        transport_mode: travel_mode,
        ..scanned
    };

    let mut preferences = result.preferences;
    preferences.extend(route_preferences.descriptions());

    with_summary(ExtractionResult::assemble(ExtractionParts {
        is_route_request: result.is_route_request,
        locations: result.locations,
        travel_mode,
        preferences,
        message: result.message,
        suggested_sequence: Some(result.suggested_sequence),
        route_preferences,
    }))
}

/// Fill in a default message when the stage left none
fn with_summary(mut result: ExtractionResult) -> ExtractionResult {
    if result.message.trim().is_empty() {
        result.message = if result.is_route_request {
            format!("Route: {}", result.suggested_sequence.join(" → "))
        } else {
            format!(
                "Showing {} location(s) mentioned in your text.",
                result.locations.len()
            )
        };
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, CompletionRequest};
    use crate::Result;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Answer(String),
        Fail,
        Hang,
    }

    /// Counts calls and answers according to its behavior
    struct StubModel {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl StubModel {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LanguageModel for StubModel {
        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Answer(text) => Ok(Completion::Text(text.clone())),
                Behavior::Fail => Err(WayfinderError::api("service unavailable")),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(Completion::Text("{}".to_string()))
                }
            }
        }
    }

    fn extractor_with(model: &Arc<StubModel>) -> LocationExtractor {
        LocationExtractor::new(Some(model.clone() as Arc<dyn LanguageModel>), false)
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[rstest]
    #[case("Paris to London", &["Paris", "London"])]
    #[case("from Berlin to Munich", &["Berlin", "Munich"])]
    #[case("From New York to Los Angeles to Chicago", &["New York", "Los Angeles", "Chicago"])]
    #[tokio::test]
    async fn test_stage_zero_skips_model(#[case] text: &str, #[case] expected: &[&str]) {
        let model = StubModel::new(Behavior::Fail);
        let result = extractor_with(&model)
            .extract_locations_and_preferences(text, TIMEOUT)
            .await;

        assert!(result.is_route_request);
        assert_eq!(result.location_names(), expected);
        assert_eq!(result.suggested_sequence, expected);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_boston_providence_preferences() {
        let result = LocationExtractor::offline()
            .extract_locations_and_preferences(
                "avoid tolls and walking from Boston to Providence",
                TIMEOUT,
            )
            .await;

        assert!(result.is_route_request);
        assert_eq!(result.location_names(), vec!["Boston", "Providence"]);
        assert_eq!(
            result.route_preferences,
            Preferences {
                transport_mode: TransportMode::Walking,
                avoid_tolls: true,
                avoid_highways: false,
                avoid_ferries: false,
            }
        );
        assert_eq!(result.travel_mode, TransportMode::Walking);
        assert_eq!(result.preferences, vec!["avoid tolls"]);
    }

    #[tokio::test]
    async fn test_model_answer_used_for_prose() {
        let model = StubModel::new(Behavior::Answer(
            r#"{"isRouteRequest": false, "locations": [{"name": "Kyoto", "timeContext": "in 1600"}], "travelMode": "transit", "preferences": ["scenic"], "message": "One place."}"#
                .to_string(),
        ));
        let result = extractor_with(&model)
            .extract_locations_and_preferences("Tell me about old Kyoto and avoid ferries", TIMEOUT)
            .await;

        assert_eq!(model.calls(), 1);
        assert!(!result.is_route_request);
        assert_eq!(result.location_names(), vec!["Kyoto"]);
        assert_eq!(result.travel_mode, TransportMode::Transit);
        assert!(result.route_preferences.avoid_ferries);
        assert_eq!(result.preferences, vec!["scenic", "avoid ferries"]);
        assert_eq!(result.message, "One place.");
    }

    #[tokio::test]
    async fn test_stated_mode_beats_model_mode() {
        let model = StubModel::new(Behavior::Answer(
            r#"{"isRouteRequest": false, "locations": ["Lisbon"], "travelMode": "driving"}"#
                .to_string(),
        ));
        let result = extractor_with(&model)
            .extract_locations_and_preferences("a quiet place near Lisbon for cycling", TIMEOUT)
            .await;

        assert_eq!(result.travel_mode, TransportMode::Cycling);
        assert_eq!(result.route_preferences.transport_mode, TransportMode::Cycling);
    }

    #[tokio::test]
    async fn test_model_failure_recovers_with_patterns() {
        let model = StubModel::new(Behavior::Fail);
        let result = extractor_with(&model)
            .extract_locations_and_preferences("The legions marched across Gaul.", TIMEOUT)
            .await;

        assert_eq!(model.calls(), 1);
        assert!(!result.is_route_request);
        assert_eq!(result.location_names(), vec!["Gaul"]);
        assert_eq!(result.message, "Showing 1 location(s) mentioned in your text.");
    }

    #[tokio::test]
    async fn test_two_fallback_mentions_become_route() {
        let model = StubModel::new(Behavior::Fail);
        let result = extractor_with(&model)
            .extract_locations_and_preferences(
                "shipping lanes link Rotterdam and Singapore.",
                TIMEOUT,
            )
            .await;

        assert!(result.is_route_request);
        assert_eq!(result.location_names(), vec!["Rotterdam", "Singapore"]);
        assert_eq!(result.suggested_sequence, result.location_names());
        assert_eq!(result.message, "Route: Rotterdam → Singapore");
    }

    #[tokio::test]
    async fn test_stage_two_route_patterns_after_normalization() {
        let model = StubModel::new(Behavior::Fail);
        let text = "*Paris* *to* *Nice* *to* Lyon";
        assert_eq!(try_structured_route_patterns(text), None);

        let result = extractor_with(&model)
            .extract_locations_and_preferences(text, TIMEOUT)
            .await;

        assert_eq!(model.calls(), 1);
        assert!(result.is_route_request);
        assert_eq!(result.location_names(), vec!["Paris", "Nice", "Lyon"]);
        assert_eq!(result.message, "Route: Paris → Nice → Lyon");
    }

    #[tokio::test]
    async fn test_dated_mentions_stay_mentions_offline() {
        let result = LocationExtractor::offline()
            .extract_locations_and_preferences(
                "Rome was sacked in the 5th century and Carthage had fallen long before.",
                TIMEOUT,
            )
            .await;

        assert!(!result.is_route_request);
        assert_eq!(result.location_names(), vec!["Rome", "Carthage"]);
        assert_eq!(result.locations[0].time_context, "5th century");
        assert_eq!(result.locations[1].time_context, "");
        assert_eq!(result.message, "Showing 2 location(s) mentioned in your text.");
    }

    #[tokio::test]
    async fn test_dated_mentions_from_model_keep_their_classification() {
        let model = StubModel::new(Behavior::Answer(
            r#"{"isRouteRequest": false, "locations": [{"name": "Rome", "timeContext": "5th century"}, {"name": "Carthage", "timeContext": ""}], "travelMode": "driving", "preferences": [], "message": "Two ancient cities."}"#
                .to_string(),
        ));
        let result = extractor_with(&model)
            .extract_locations_and_preferences(
                "Rome was sacked in the 5th century and Carthage had fallen long before.",
                TIMEOUT,
            )
            .await;

        assert_eq!(model.calls(), 1);
        assert!(!result.is_route_request);
        assert_eq!(result.location_names(), vec!["Rome", "Carthage"]);
        assert_eq!(result.locations[0].time_context, "5th century");
        assert_eq!(result.locations[1].time_context, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_handled_like_failure() {
        let model = StubModel::new(Behavior::Hang);
        let result = extractor_with(&model)
            .extract_locations_and_preferences(
                "In the 5th century Rome was sacked.",
                Duration::from_millis(200),
            )
            .await;

        assert_eq!(model.calls(), 1);
        assert!(!result.is_route_request);
        assert_eq!(result.location_names(), vec!["Rome"]);
        assert_eq!(result.locations[0].time_context, "5th century");
    }

    #[tokio::test]
    async fn test_prose_answer_from_model_falls_back() {
        let model = StubModel::new(Behavior::Answer("I have no idea.".to_string()));
        let result = extractor_with(&model)
            .extract_locations_and_preferences("we loved the sunsets over Santorini.", TIMEOUT)
            .await;

        assert_eq!(result.location_names(), vec!["Santorini"]);
        assert_eq!(result.suggested_sequence, result.location_names());
    }

    #[tokio::test]
    async fn test_nothing_found_message() {
        let model = StubModel::new(Behavior::Fail);
        let result = extractor_with(&model)
            .extract_locations_and_preferences("somewhere nice please", TIMEOUT)
            .await;

        assert!(result.locations.is_empty());
        assert!(!result.is_route_request);
        assert_eq!(result.message, NOTHING_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_blank_input_skips_model() {
        let model = StubModel::new(Behavior::Fail);
        let result = extractor_with(&model)
            .extract_locations_and_preferences("   ", TIMEOUT)
            .await;

        assert_eq!(model.calls(), 0);
        assert_eq!(result.message, NOTHING_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_extraction_is_idempotent() {
        let extractor = LocationExtractor::offline();
        let text = "Marco Polo left Venice and reached China in the 13th century.";
        let first = extractor.extract_locations_and_preferences(text, TIMEOUT).await;
        let second = extractor.extract_locations_and_preferences(text, TIMEOUT).await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_offline_constructor() {
        assert!(LocationExtractor::offline().is_offline());
        assert!(LocationExtractor::new(None, true).is_offline());
    }
}
