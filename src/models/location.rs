//! Location model for extracted place names

use serde::{Deserialize, Serialize};

/// A place named in the user's text
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Place name as written by the user (trimmed, original case)
    pub name: String,
    /// Period or date the text associates with this place, empty if none
    #[serde(default)]
    pub time_context: String,
    /// `[longitude, latitude]`, attached after geocoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[f64; 2]>,
}

impl Location {
    /// Create a new location without a time context
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            time_context: String::new(),
            coordinates: None,
        }
    }

    /// Create a location carrying a time context
    #[must_use]
    pub fn with_time_context(name: impl Into<String>, time_context: impl Into<String>) -> Self {
        Self {
            time_context: time_context.into().trim().to_string(),
            ..Self::new(name)
        }
    }

    /// Copy of this location positioned at the given coordinates
    #[must_use]
    pub fn geocoded(&self, coordinates: [f64; 2]) -> Self {
        Self {
            coordinates: Some(coordinates),
            ..self.clone()
        }
    }

    /// Key used for duplicate detection
    #[must_use]
    pub fn dedup_key(&self) -> String {
        self.name.trim().to_lowercase()
    }
}
