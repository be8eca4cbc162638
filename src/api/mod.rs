use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extraction::LocationExtractor;
use crate::models::{ExtractionResult, MapPlan};
use crate::planner::{MapSession, PlanOutcome};

const MAX_TEXT_CHARS: usize = 2_000;
const MAX_TIMEOUT_MS: u64 = 60_000;

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppContext {
    pub extractor: Arc<LocationExtractor>,
    /// Absent when geocoding is not configured
    pub session: Option<Arc<MapSession>>,
    pub extraction_timeout: Duration,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub text: String,
    pub timeout_ms: Option<u64>,
}

#[derive(Serialize, Deserialize)]
pub struct PlanRequest {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub offline: bool,
    pub planning: bool,
}

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/extract", post(extract))
        .route("/plan", post(plan))
        .with_state(ctx)
}

async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        offline: ctx.extractor.is_offline(),
        planning: ctx.session.is_some(),
    })
}

async fn extract(
    State(ctx): State<AppContext>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractionResult>, StatusCode> {
    check_text(&request.text)?;
    let timeout = request
        .timeout_ms
        .map_or(ctx.extraction_timeout, |ms| {
            Duration::from_millis(ms.clamp(1, MAX_TIMEOUT_MS))
        });

    let result = ctx
        .extractor
        .extract_locations_and_preferences(&request.text, timeout)
        .await;
    Ok(Json(result))
}

async fn plan(
    State(ctx): State<AppContext>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<MapPlan>, StatusCode> {
    check_text(&request.text)?;
    let session = ctx.session.ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    match session.submit(&request.text).await {
        PlanOutcome::Current(plan) => Ok(Json(plan)),
        PlanOutcome::Superseded => {
            debug!("Plan superseded by a newer request");
            Err(StatusCode::CONFLICT)
        }
    }
}

fn check_text(text: &str) -> Result<(), StatusCode> {
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_context() -> AppContext {
        AppContext {
            extractor: Arc::new(LocationExtractor::offline()),
            session: None,
            extraction_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let Json(health) = health(State(offline_context())).await;
        assert_eq!(health.status, "ok");
        assert!(health.offline);
        assert!(!health.planning);
    }

    #[tokio::test]
    async fn test_extract_route() {
        let request = ExtractRequest {
            text: "Paris to London".to_string(),
            timeout_ms: Some(500),
        };
        let Json(result) = extract(State(offline_context()), Json(request)).await.unwrap();
        assert!(result.is_route_request);
        assert_eq!(result.location_names(), vec!["Paris", "London"]);
    }

    #[tokio::test]
    async fn test_extract_rejects_oversized_text() {
        let request = ExtractRequest {
            text: "a".repeat(MAX_TEXT_CHARS + 1),
            timeout_ms: None,
        };
        let status = extract(State(offline_context()), Json(request)).await.unwrap_err();
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_plan_without_geocoding_is_unavailable() {
        let request = PlanRequest {
            text: "Paris to London".to_string(),
        };
        let status = plan(State(offline_context()), Json(request)).await.unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_extract_request_accepts_camel_case() {
        let request: ExtractRequest =
            serde_json::from_str(r#"{"text": "Oslo", "timeoutMs": 250}"#).unwrap();
        assert_eq!(request.timeout_ms, Some(250));
    }
}
