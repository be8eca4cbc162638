//! Integration tests for the Wayfinder extraction pipeline and planner

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rstest::rstest;

use wayfinder::models::{Avoid, PlanKind, Route};
use wayfinder::{
    Completion, CompletionRequest, Geocoder, LanguageModel, LocationExtractor, MapPlanner,
    MapSession, PlanOutcome, Preferences, Result, Router, TransportMode, WayfinderError,
};

const TIMEOUT: Duration = Duration::from_secs(2);

/// Model that always fails and counts how often it was asked
#[derive(Default)]
struct RejectingModel {
    calls: AtomicUsize,
}

#[async_trait]
impl LanguageModel for RejectingModel {
    async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(WayfinderError::extraction("rejected"))
    }
}

/// Model answering with a fixed function call
struct FunctionCallModel(serde_json::Value);

#[async_trait]
impl LanguageModel for FunctionCallModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let function = request
            .function
            .as_ref()
            .ok_or_else(|| WayfinderError::extraction("expected a function schema"))?;
        Ok(Completion::FunctionCall {
            name: function.name.clone(),
            arguments: self.0.clone(),
        })
    }
}

/// Places every name on a line of longitudes
struct LineGeocoder;

#[async_trait]
impl Geocoder for LineGeocoder {
    async fn geocode(&self, name: &str) -> Result<[f64; 2]> {
        if name.eq_ignore_ascii_case("nowhere") {
            return Err(WayfinderError::not_found(name));
        }
        let lng = name.len() as f64;
        Ok([lng, 45.0])
    }
}

struct StraightRouter;

#[async_trait]
impl Router for StraightRouter {
    async fn route(
        &self,
        waypoints: &[[f64; 2]],
        _mode: TransportMode,
        _avoid: &[Avoid],
    ) -> Result<Route> {
        Ok(Route {
            geometry: waypoints.to_vec(),
            distance_meters: 1_000.0 * waypoints.len() as f64,
            duration_seconds: 600.0,
        })
    }
}

fn rejecting() -> (Arc<RejectingModel>, LocationExtractor) {
    let model = Arc::new(RejectingModel::default());
    let extractor = LocationExtractor::new(Some(model.clone() as Arc<dyn LanguageModel>), false);
    (model, extractor)
}

#[rstest]
#[case("Lyon to Marseille", "Lyon", "Marseille")]
#[case("  Porto   to Lisbon ", "Porto", "Lisbon")]
#[case("Kyoto to Nara", "Kyoto", "Nara")]
#[tokio::test]
async fn test_x_to_y_yields_two_route_locations(
    #[case] text: &str,
    #[case] first: &str,
    #[case] second: &str,
) {
    let (model, extractor) = rejecting();
    let result = extractor.extract_locations_and_preferences(text, TIMEOUT).await;

    assert!(result.is_route_request);
    assert_eq!(result.location_names(), vec![first, second]);
    assert_eq!(result.suggested_sequence, vec![first, second]);
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_three_waypoint_route() {
    let (_, extractor) = rejecting();
    let result = extractor
        .extract_locations_and_preferences("From New York to Los Angeles to Chicago", TIMEOUT)
        .await;

    assert!(result.is_route_request);
    assert_eq!(
        result.location_names(),
        vec!["New York", "Los Angeles", "Chicago"]
    );
}

#[tokio::test]
async fn test_documented_preference_example() {
    let (_, extractor) = rejecting();
    let result = extractor
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
}

#[tokio::test]
async fn test_rome_mention_with_time_context() {
    let (model, extractor) = rejecting();
    let result = extractor
        .extract_locations_and_preferences(
            "The city of Rome was sacked during the 5th century while Ravenna held out.",
            TIMEOUT,
        )
        .await;

    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    assert!(!result.is_route_request);
    assert_eq!(result.location_names(), vec!["Rome", "Ravenna"]);
    assert_eq!(result.locations[0].time_context, "5th century");
    assert_eq!(result.locations[1].time_context, "");
    assert_eq!(result.suggested_sequence, result.location_names());
}

#[tokio::test]
async fn test_single_mention_is_not_a_route() {
    let (_, extractor) = rejecting();
    let result = extractor
        .extract_locations_and_preferences("In the 5th century Rome was sacked.", TIMEOUT)
        .await;

    assert!(!result.is_route_request);
    assert_eq!(result.location_names(), vec!["Rome"]);
    assert_eq!(result.locations[0].time_context, "5th century");
}

#[tokio::test]
async fn test_function_calling_model_result() {
    let model = Arc::new(FunctionCallModel(serde_json::json!({
        "isRouteRequest": true,
        "locations": ["Vienna", {"name": "Salzburg", "timeContext": ""}, "Innsbruck"],
        "travelMode": "transit",
        "preferences": [],
        "message": "Train trip across Austria.",
        "suggestedSequence": ["Vienna", "Salzburg", "Innsbruck"]
    })));
    let extractor = LocationExtractor::new(Some(model as Arc<dyn LanguageModel>), true);

    let result = extractor
        .extract_locations_and_preferences("a train trip across Austria avoiding ferries", TIMEOUT)
        .await;

    assert!(result.is_route_request);
    assert_eq!(result.location_names(), vec!["Vienna", "Salzburg", "Innsbruck"]);
    assert_eq!(result.travel_mode, TransportMode::Transit);
    assert!(result.route_preferences.avoid_ferries);
    assert_eq!(result.preferences, vec!["avoid ferries"]);
}

#[tokio::test]
async fn test_session_plans_route_end_to_end() {
    let planner = MapPlanner::new(
        Arc::new(LocationExtractor::offline()),
        Arc::new(LineGeocoder),
        Arc::new(StraightRouter),
        TIMEOUT,
    );
    let session = MapSession::new(planner);

    let PlanOutcome::Current(plan) = session.submit("cycling from Ghent to Nowhere to Bruges").await
    else {
        panic!("single query must be current");
    };

    assert_eq!(plan.kind, PlanKind::Route);
    assert_eq!(plan.travel_mode, TransportMode::Cycling);
    let names: Vec<&str> = plan.features.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Ghent", "Bruges"]);
    assert!(plan.message.contains("Could not find Nowhere"));
    assert!(plan.bounds.is_some());
}

#[tokio::test]
async fn test_serialized_result_uses_camel_case() {
    let result = LocationExtractor::offline()
        .extract_locations_and_preferences("Bern to Basel", TIMEOUT)
        .await;
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["isRouteRequest"], true);
    assert_eq!(json["travelMode"], "driving");
    assert_eq!(json["suggestedSequence"][1], "Basel");
    assert_eq!(json["routePreferences"]["avoidTolls"], false);
}
