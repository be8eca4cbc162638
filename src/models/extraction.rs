//! Canonical output of the extraction pipeline

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Location, Preferences, TransportMode};

/// Result of interpreting one user query.
///
/// Built only through [`ExtractionResult::assemble`], which enforces:
/// - `locations` and `suggested_sequence` list the same names in the same order
/// - a route request always has at least two locations
/// - location names are unique (case-insensitive, trimmed)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub is_route_request: bool,
    pub locations: Vec<Location>,
    pub travel_mode: TransportMode,
    /// Human-readable preferences, e.g. "avoid tolls"
    pub preferences: Vec<String>,
    /// User-facing explanation
    pub message: String,
    pub suggested_sequence: Vec<String>,
    /// Structured preferences for the router
    pub route_preferences: Preferences,
}

/// Loose parts collected by one extraction stage
#[derive(Debug, Default, Clone)]
pub struct ExtractionParts {
    pub is_route_request: bool,
    pub locations: Vec<Location>,
    pub travel_mode: TransportMode,
    pub preferences: Vec<String>,
    pub message: String,
    /// Display order proposed by the stage, if any
    pub suggested_sequence: Option<Vec<String>>,
    pub route_preferences: Preferences,
}

impl ExtractionResult {
    /// Normalize stage output into a result that satisfies the invariants
    #[must_use]
    pub fn assemble(parts: ExtractionParts) -> Self {
        let mut locations = dedup_locations(parts.locations);

        if let Some(sequence) = &parts.suggested_sequence {
            reorder_by_sequence(&mut locations, sequence);
        }

        let suggested_sequence = locations.iter().map(|l| l.name.clone()).collect();
        let is_route_request = parts.is_route_request && locations.len() >= 2;

        let mut seen = HashSet::new();
        let preferences = parts
            .preferences
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty() && seen.insert(p.to_lowercase()))
            .collect();

        Self {
            is_route_request,
            locations,
            travel_mode: parts.travel_mode,
            preferences,
            message: parts.message,
            suggested_sequence,
            route_preferences: parts.route_preferences,
        }
    }

    /// Result carrying no locations, only a message
    #[must_use]
    pub fn empty(message: impl Into<String>, route_preferences: Preferences) -> Self {
        Self::assemble(ExtractionParts {
            travel_mode: route_preferences.transport_mode,
            preferences: route_preferences.descriptions(),
            message: message.into(),
            route_preferences,
            ..ExtractionParts::default()
        })
    }

    #[must_use]
    pub fn location_names(&self) -> Vec<&str> {
        self.locations.iter().map(|l| l.name.as_str()).collect()
    }
}

fn dedup_locations(locations: Vec<Location>) -> Vec<Location> {
    let mut seen = HashSet::new();
    locations
        .into_iter()
        .filter(|l| !l.name.trim().is_empty())
        .map(|mut l| {
            l.name = l.name.trim().to_string();
            l
        })
        .filter(|l| seen.insert(l.dedup_key()))
        .collect()
}

/// Reorders `locations` to follow `sequence` when the sequence names exactly
/// the same places. Any mismatch leaves the extraction order in place.
fn reorder_by_sequence(locations: &mut Vec<Location>, sequence: &[String]) {
    if sequence.len() != locations.len() {
        return;
    }

    let mut ordered: Vec<Location> = Vec::with_capacity(locations.len());
    for name in sequence {
        let key = name.trim().to_lowercase();
        if ordered.iter().any(|l| l.dedup_key() == key) {
            return;
        }
        match locations.iter().find(|l| l.dedup_key() == key) {
            Some(location) => ordered.push(location.clone()),
            None => return,
        }
    }

    *locations = ordered;
}
