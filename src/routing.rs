//! Waypoints to a drivable, walkable or cyclable path

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::MapboxConfig;
use crate::http::build_client;
use crate::models::{Avoid, Route, TransportMode};
use crate::{Result, WayfinderError};

/// Computes a path through ordered `[longitude, latitude]` waypoints
#[async_trait]
pub trait Router: Send + Sync {
    /// `WayfinderError::NoRoute` when no path exists
    async fn route(
        &self,
        waypoints: &[[f64; 2]],
        mode: TransportMode,
        avoid: &[Avoid],
    ) -> Result<Route>;
}

/// Mapbox Directions API v5 client
pub struct MapboxRouter {
    client: ClientWithMiddleware,
    base_url: String,
    access_token: String,
}

/// Directions profile for a travel mode. Mapbox has no transit profile.
#[must_use]
pub fn mapbox_profile(mode: TransportMode) -> &'static str {
    match mode {
        TransportMode::Driving | TransportMode::Transit => "driving",
        TransportMode::Walking => "walking",
        TransportMode::Cycling => "cycling",
    }
}

fn exclude_value(avoid: &[Avoid]) -> String {
    avoid
        .iter()
        .map(|a| match a {
            Avoid::Tolls => "toll",
            Avoid::Highways => "motorway",
            Avoid::Ferries => "ferry",
        })
        .collect::<Vec<_>>()
        .join(",")
}

impl MapboxRouter {
    pub fn new(config: &MapboxConfig) -> anyhow::Result<Self> {
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| WayfinderError::config("Mapbox access token is not set"))?;

        let client = build_client(
            Duration::from_secs(u64::from(config.timeout_seconds)),
            config.max_retries,
        )?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn url_for(&self, waypoints: &[[f64; 2]], mode: TransportMode, avoid: &[Avoid]) -> String {
        let coordinates = waypoints
            .iter()
            .map(|[lng, lat]| format!("{lng},{lat}"))
            .collect::<Vec<_>>()
            .join(";");

        let mut url = format!(
            "{}/directions/v5/mapbox/{}/{}?geometries=geojson&overview=full&access_token={}",
            self.base_url,
            mapbox_profile(mode),
            coordinates,
            self.access_token
        );

        // Walking and cycling profiles reject exclusions.
        if mode == TransportMode::Driving || mode == TransportMode::Transit {
            let exclude = exclude_value(avoid);
            if !exclude.is_empty() {
                url.push_str("&exclude=");
                url.push_str(&exclude);
            }
        }

        url
    }
}

#[async_trait]
impl Router for MapboxRouter {
    #[instrument(skip(self, waypoints), fields(waypoints = waypoints.len()))]
    async fn route(
        &self,
        waypoints: &[[f64; 2]],
        mode: TransportMode,
        avoid: &[Avoid],
    ) -> Result<Route> {
        if waypoints.len() < 2 {
            return Err(WayfinderError::validation(
                "A route needs at least two waypoints",
            ));
        }
        if mode == TransportMode::Transit {
            warn!("Transit routing is not available, using driving directions");
        }

        let response = self
            .client
            .get(self.url_for(waypoints, mode, avoid))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Directions request failed with {}: {}", status, error_text);
            return Err(match status.as_u16() {
                401 | 403 => WayfinderError::config("Mapbox rejected the access token"),
                404 | 422 => WayfinderError::no_route(error_text),
                _ => WayfinderError::api(format!("Directions error {status}: {error_text}")),
            });
        }

        let body: mapbox::DirectionsResponse = response.json().await?;
        let route = body.into_route()?;
        debug!(
            "Route found: {} in {}",
            route.format_distance(),
            route.format_duration()
        );
        Ok(route)
    }
}

/// Mapbox directions response structures
mod mapbox {
    use serde::Deserialize;

    use crate::models::Route;
    use crate::{Result, WayfinderError};

    #[derive(Debug, Deserialize)]
    pub struct DirectionsResponse {
        pub code: String,
        #[serde(default)]
        pub message: Option<String>,
        #[serde(default)]
        pub routes: Vec<DirectionsRoute>,
    }

    #[derive(Debug, Deserialize)]
    pub struct DirectionsRoute {
        pub distance: f64,
        pub duration: f64,
        pub geometry: Geometry,
    }

    #[derive(Debug, Deserialize)]
    pub struct Geometry {
        pub coordinates: Vec<[f64; 2]>,
    }

    impl DirectionsResponse {
        pub fn into_route(self) -> Result<Route> {
            if self.code != "Ok" {
                return Err(WayfinderError::no_route(
                    self.message.unwrap_or(self.code),
                ));
            }

            let route = self
                .routes
                .into_iter()
                .next()
                .ok_or_else(|| WayfinderError::no_route("No routes in response"))?;

            Ok(Route {
                geometry: route.geometry.coordinates,
                distance_meters: route.distance,
                duration_seconds: route.duration,
            })
        }
    }
}
