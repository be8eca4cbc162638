//! Data models for Wayfinder
//!
//! This module contains the core domain models organized by concern:
//! - Location: a place named in the user's text
//! - Preferences: travel mode and avoidance flags
//! - Extraction: the canonical pipeline result
//! - Map plan: what the map view draws

pub mod extraction;
pub mod location;
pub mod map_plan;
pub mod preferences;

// Re-export all public types for convenient access
pub use extraction::{ExtractionParts, ExtractionResult};
pub use location::Location;
pub use map_plan::{BoundingBox, MapPlan, PlanKind, PointFeature, Route};
pub use preferences::{Avoid, Preferences, TransportMode};
