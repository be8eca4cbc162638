//! `Wayfinder` - free-text travel requests rendered as map routes and markers
//!
//! The core is a fault-tolerant extraction cascade that turns a query such as
//! "from Paris to London" or a paragraph of prose into ordered locations and
//! route preferences, degrading from pattern shortcuts through a language
//! model to regex fallbacks. Geocoding, routing and the HTTP surface sit on top.

pub mod api;
pub mod config;
pub mod error;
pub mod extraction;
pub mod geocoding;
pub mod http;
pub mod llm;
pub mod models;
pub mod planner;
pub mod routing;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use config::WayfinderConfig;
pub use error::WayfinderError;
pub use extraction::LocationExtractor;
pub use geocoding::{Geocoder, MapboxGeocoder};
pub use llm::{Completion, CompletionRequest, LanguageModel, OpenAiCompatibleClient};
pub use models::{ExtractionResult, Location, MapPlan, Preferences, TransportMode};
pub use planner::{MapPlanner, MapSession, PlanOutcome};
pub use routing::{MapboxRouter, Router};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WayfinderError>;
