//! Place name to coordinates

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::MapboxConfig;
use crate::http::build_client;
use crate::{Result, WayfinderError};

/// Resolves a place name to `[longitude, latitude]`
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `WayfinderError::NotFound` when nothing matches
    async fn geocode(&self, name: &str) -> Result<[f64; 2]>;
}

/// Mapbox Geocoding API v5 client
pub struct MapboxGeocoder {
    client: ClientWithMiddleware,
    base_url: String,
    access_token: String,
}

impl MapboxGeocoder {
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

    fn url_for(&self, name: &str) -> String {
        format!(
            "{}/geocoding/v5/mapbox.places/{}.json?limit=1&access_token={}",
            self.base_url,
            urlencoding::encode(name),
            self.access_token
        )
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, name: &str) -> Result<[f64; 2]> {
        let response = self.client.get(self.url_for(name)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Geocoding request failed with {}: {}", status, error_text);
            return Err(match status.as_u16() {
                401 | 403 => WayfinderError::config("Mapbox rejected the access token"),
                404 => WayfinderError::not_found(name),
                _ => WayfinderError::api(format!("Geocoding error {status}: {error_text}")),
            });
        }

        let body: mapbox::GeocodingResponse = response.json().await?;
        let coordinates = body.first_center(name)?;
        debug!("Geocoded '{}' to {:?}", name, coordinates);
        Ok(coordinates)
    }
}

/// Mapbox geocoding response structures
mod mapbox {
    use serde::Deserialize;

    use crate::{Result, WayfinderError};

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResponse {
        #[serde(default)]
        pub features: Vec<Feature>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Feature {
        #[serde(default)]
        pub place_name: String,
        /// `[longitude, latitude]`
        pub center: Vec<f64>,
    }

    impl GeocodingResponse {
        pub fn first_center(self, query: &str) -> Result<[f64; 2]> {
            let feature = self
                .features
                .into_iter()
                .next()
                .ok_or_else(|| WayfinderError::not_found(query))?;

            match feature.center.as_slice() {
                [lng, lat] if lng.is_finite() && lat.is_finite() => Ok([*lng, *lat]),
                _ => Err(WayfinderError::malformed(format!(
                    "Geocoding result '{}' has invalid center {:?}",
                    feature.place_name, feature.center
                ))),
            }
        }
    }
}
