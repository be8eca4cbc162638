//! Natural-language location and route extraction

pub mod cascade;
pub mod classifier;
pub mod json_repair;
pub mod language_model;
pub mod patterns;
pub mod preferences;

pub use cascade::{LocationExtractor, NOTHING_FOUND_MESSAGE};
pub use classifier::classify;
pub use language_model::{EXTRACTION_FUNCTION, LanguageModelExtractor};
pub use patterns::{try_mention_extraction, try_structured_route_patterns};
pub use preferences::{detect_transport_mode, extract_preferences};
