//! What the map view is asked to draw for one query

use serde::{Deserialize, Serialize};

use super::{Location, TransportMode};

/// Path returned by the router
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// `[longitude, latitude]` pairs in travel order
    pub geometry: Vec<[f64; 2]>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl Route {
    /// Format distance in kilometers
    #[must_use]
    pub fn format_distance(&self) -> String {
        format!("{:.1} km", self.distance_meters / 1000.0)
    }

    /// Format duration as hours and minutes
    #[must_use]
    pub fn format_duration(&self) -> String {
        let total_minutes = (self.duration_seconds / 60.0).round() as u64;
        let hours = total_minutes / 60;
        let minutes = total_minutes % 60;
        if hours > 0 {
            format!("{hours} h {minutes} min")
        } else {
            format!("{minutes} min")
        }
    }
}

/// A marker on the map
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PointFeature {
    pub name: String,
    pub time_context: String,
    pub coordinates: [f64; 2],
    /// Position in the display sequence, starting at 1
    pub order: usize,
}

/// Viewport to fit, in degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Smallest box containing every coordinate, `None` for an empty slice
    #[must_use]
    pub fn around(coordinates: &[[f64; 2]]) -> Option<Self> {
        let (first, rest) = coordinates.split_first()?;
        let mut bounds = Self {
            min_lng: first[0],
            min_lat: first[1],
            max_lng: first[0],
            max_lat: first[1],
        };
        for [lng, lat] in rest {
            bounds.min_lng = bounds.min_lng.min(*lng);
            bounds.min_lat = bounds.min_lat.min(*lat);
            bounds.max_lng = bounds.max_lng.max(*lng);
            bounds.max_lat = bounds.max_lat.max(*lat);
        }
        Some(bounds)
    }

    #[must_use]
    pub fn center(&self) -> [f64; 2] {
        [
            (self.min_lng + self.max_lng) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        ]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    /// A routed path between waypoints
    Route,
    /// Unconnected markers
    Points,
    /// Nothing to draw
    Empty,
}

/// Input for the map view: a route line, point features and a box to fit
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapPlan {
    pub kind: PlanKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
    pub features: Vec<PointFeature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    pub travel_mode: TransportMode,
    pub preferences: Vec<String>,
    pub message: String,
}

impl MapPlan {
    /// Markers for geocoded locations, numbered in display order
    #[must_use]
    pub fn features_for(locations: &[Location]) -> Vec<PointFeature> {
        locations
            .iter()
            .filter_map(|l| l.coordinates.map(|c| (l, c)))
            .enumerate()
            .map(|(i, (location, coordinates))| PointFeature {
                name: location.name.clone(),
                time_context: location.time_context.clone(),
                coordinates,
                order: i + 1,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_around_points() {
        let bounds = BoundingBox::around(&[[2.35, 48.85], [-0.12, 51.5], [13.4, 52.52]]).unwrap();
        assert_eq!(bounds.min_lng, -0.12);
        assert_eq!(bounds.max_lng, 13.4);
        assert_eq!(bounds.min_lat, 48.85);
        assert_eq!(bounds.max_lat, 52.52);
    }

    #[test]
    fn test_bounding_box_empty() {
        assert!(BoundingBox::around(&[]).is_none());
    }

    #[test]
    fn test_single_point_box_is_degenerate() {
        let bounds = BoundingBox::around(&[[12.5, 41.9]]).unwrap();
        assert_eq!(bounds.center(), [12.5, 41.9]);
    }

    #[test]
    fn test_route_formatting() {
        let route = Route {
            geometry: vec![],
            distance_meters: 343_500.0,
            duration_seconds: 12_600.0,
        };
        assert_eq!(route.format_distance(), "343.5 km");
        assert_eq!(route.format_duration(), "3 h 30 min");
    }

    #[test]
    fn test_features_skip_ungeocoded_locations() {
        let locations = vec![
            Location::new("Paris").geocoded([2.35, 48.85]),
            Location::new("Atlantis"),
            Location::new("London").geocoded([-0.12, 51.5]),
        ];
        let features = MapPlan::features_for(&locations);
        assert_eq!(features.len(), 2);
        assert_eq!(features[1].name, "London");
        assert_eq!(features[1].order, 2);
    }
}
