//! Travel mode and route avoidance preferences

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// How the user wants to travel
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Driving,
    Walking,
    Cycling,
    Transit,
}

impl TransportMode {
    /// Clamp a free-form mode token to one of the four modes.
    /// Anything unrecognized becomes `Driving`.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "walking" | "walk" | "foot" | "on foot" => TransportMode::Walking,
            "cycling" | "cycle" | "bike" | "biking" | "bicycle" => TransportMode::Cycling,
            "transit" | "public transport" | "public transit" => TransportMode::Transit,
            _ => TransportMode::Driving,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Driving => "driving",
            TransportMode::Walking => "walking",
            TransportMode::Cycling => "cycling",
            TransportMode::Transit => "transit",
        }
    }
}

impl Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Road features a route may be asked to avoid
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Avoid {
    Tolls,
    Highways,
    Ferries,
}

/// Routing preferences, always fully populated
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub transport_mode: TransportMode,
    pub avoid_tolls: bool,
    pub avoid_highways: bool,
    pub avoid_ferries: bool,
}

impl Preferences {
    /// Avoidance flags as a set for the router
    #[must_use]
    pub fn avoid_set(&self) -> Vec<Avoid> {
        let mut avoid = Vec::new();
        if self.avoid_tolls {
            avoid.push(Avoid::Tolls);
        }
        if self.avoid_highways {
            avoid.push(Avoid::Highways);
        }
        if self.avoid_ferries {
            avoid.push(Avoid::Ferries);
        }
        avoid
    }

    /// Human-readable preference strings ("avoid tolls", ...)
    #[must_use]
    pub fn descriptions(&self) -> Vec<String> {
        self.avoid_set()
            .into_iter()
            .map(|avoid| match avoid {
                Avoid::Tolls => "avoid tolls".to_string(),
                Avoid::Highways => "avoid highways".to_string(),
                Avoid::Ferries => "avoid ferries".to_string(),
            })
            .collect()
    }
}
