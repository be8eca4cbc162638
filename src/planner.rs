//! From free text to a map plan: extract, geocode, route
//!
//! Geocoding of all locations runs concurrently on the calling task. Route
//! or points is decided again after geocoding: a route request stays a route
//! only while at least two waypoints were found on the map.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::extraction::LocationExtractor;
use crate::geocoding::Geocoder;
use crate::models::{BoundingBox, ExtractionResult, Location, MapPlan, PlanKind, Route};
use crate::routing::Router;

/// Builds map plans from user text
pub struct MapPlanner {
    extractor: Arc<LocationExtractor>,
    geocoder: Arc<dyn Geocoder>,
    router: Arc<dyn Router>,
    extraction_timeout: Duration,
}

impl MapPlanner {
    pub fn new(
        extractor: Arc<LocationExtractor>,
        geocoder: Arc<dyn Geocoder>,
        router: Arc<dyn Router>,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            geocoder,
            router,
            extraction_timeout,
        }
    }

    pub fn extractor(&self) -> &Arc<LocationExtractor> {
        &self.extractor
    }

    /// Plan for `text`. Collaborator failures become messages, never errors.
    #[instrument(skip(self, text))]
    pub async fn plan(&self, text: &str) -> MapPlan {
        let extraction = self
            .extractor
            .extract_locations_and_preferences(text, self.extraction_timeout)
            .await;

        let (located, missing) = self.geocode_all(&extraction.locations).await;

        let is_route = extraction.is_route_request && located.len() >= 2;

        let mut notes = Vec::new();
        if !missing.is_empty() {
            notes.push(format!("Could not find {} on the map.", missing.join(", ")));
        }

        let route = if is_route {
            self.route_through(&located, &extraction, &mut notes).await
        } else {
            None
        };

        let plan = build_plan(extraction, located, route, notes);
        info!(
            "Planned {:?} with {} feature(s)",
            plan.kind,
            plan.features.len()
        );
        plan
    }

    async fn geocode_all(&self, locations: &[Location]) -> (Vec<Location>, Vec<String>) {
        let lookups = locations.iter().map(|location| async move {
            (location, self.geocoder.geocode(&location.name).await)
        });

        let mut located = Vec::new();
        let mut missing = Vec::new();
        for (location, outcome) in join_all(lookups).await {
            match outcome {
                Ok(coordinates) => located.push(location.geocoded(coordinates)),
                Err(e) => {
                    warn!("Dropping '{}': {}", location.name, e);
                    missing.push(location.name.clone());
                }
            }
        }
        (located, missing)
    }

    async fn route_through(
        &self,
        located: &[Location],
        extraction: &ExtractionResult,
        notes: &mut Vec<String>,
    ) -> Option<Route> {
        let waypoints: Vec<[f64; 2]> = located.iter().filter_map(|l| l.coordinates).collect();
        let avoid = extraction.route_preferences.avoid_set();

        match self
            .router
            .route(&waypoints, extraction.travel_mode, &avoid)
            .await
        {
            Ok(route) => Some(route),
            Err(e) => {
                warn!("Routing failed, showing points instead: {}", e);
                notes.push(e.user_message());
                None
            }
        }
    }
}

fn build_plan(
    extraction: ExtractionResult,
    located: Vec<Location>,
    route: Option<Route>,
    notes: Vec<String>,
) -> MapPlan {
    let features = MapPlan::features_for(&located);

    let kind = match (&route, features.is_empty()) {
        (Some(_), _) => PlanKind::Route,
        (None, false) => PlanKind::Points,
        (None, true) => PlanKind::Empty,
    };

    let mut extent: Vec<[f64; 2]> = features.iter().map(|f| f.coordinates).collect();
    if let Some(route) = &route {
        extent.extend_from_slice(&route.geometry);
    }

    let mut message = match &route {
        Some(route) => format!(
            "{} ({}, {})",
            extraction.message,
            route.format_distance(),
            route.format_duration()
        ),
        None => extraction.message,
    };
    for note in notes {
        message.push(' ');
        message.push_str(&note);
    }

    MapPlan {
        kind,
        route,
        features,
        bounds: BoundingBox::around(&extent),
        travel_mode: extraction.travel_mode,
        preferences: extraction.preferences,
        message: message.trim().to_string(),
    }
}

/// Result of a session query
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// Plan for the latest query
    Current(MapPlan),
    /// A newer query started before this one finished
    Superseded,
}

/// One map view. Only the plan of the most recent query is ever current.
pub struct MapSession {
    planner: MapPlanner,
    generation: AtomicU64,
}

impl MapSession {
    pub fn new(planner: MapPlanner) -> Self {
        Self {
            planner,
            generation: AtomicU64::new(0),
        }
    }

    pub fn planner(&self) -> &MapPlanner {
        &self.planner
    }

    pub async fn submit(&self, text: &str) -> PlanOutcome {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let plan = self.planner.plan(text).await;

        if self.generation.load(Ordering::SeqCst) == ticket {
            PlanOutcome::Current(plan)
        } else {
            debug!("Discarding plan for query {}, a newer one is pending", ticket);
            PlanOutcome::Superseded
        }
    }
}
