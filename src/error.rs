//! Error types and handling for the Wayfinder pipeline

use thiserror::Error;

/// Main error type for Wayfinder
#[derive(Error, Debug)]
pub enum WayfinderError {
    /// The language model produced nothing usable
    #[error("Extraction failed: {message}")]
    ExtractionFailure { message: String },

    /// The language model did not answer within the caller's budget
    #[error("Extraction timed out after {timeout_ms} ms")]
    TimeoutExceeded { timeout_ms: u64 },

    /// Geocoder found no match for a location name
    #[error("Location not found: {name}")]
    NotFound { name: String },

    /// Router found no path between the waypoints
    #[error("No route found: {message}")]
    NoRoute { message: String },

    /// A collaborator answered with an unexpected shape
    #[error("Malformed upstream response: {message}")]
    MalformedResponse { message: String },

    /// API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WayfinderError {
    /// Create a new extraction failure
    pub fn extraction<S: Into<String>>(message: S) -> Self {
        Self::ExtractionFailure {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn no_route<S: Into<String>>(message: S) -> Self {
        Self::NoRoute {
            message: message.into(),
        }
    }

    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Failures the cascade recovers from by falling through to the regex stage
    #[must_use]
    pub fn is_recoverable_extraction(&self) -> bool {
        matches!(
            self,
            WayfinderError::ExtractionFailure { .. }
                | WayfinderError::TimeoutExceeded { .. }
                | WayfinderError::Api { .. }
                | WayfinderError::MalformedResponse { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WayfinderError::ExtractionFailure { .. } | WayfinderError::TimeoutExceeded { .. } => {
                "Could not understand the request. Please try rephrasing it.".to_string()
            }
            WayfinderError::NotFound { name } => {
                format!("Could not find \"{name}\" on the map.")
            }
            WayfinderError::NoRoute { .. } => {
                "No route could be found between these places.".to_string()
            }
            WayfinderError::MalformedResponse { .. } | WayfinderError::Api { .. } => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            WayfinderError::Config { .. } => {
                "Configuration error. Please check your config file and access tokens.".to_string()
            }
            WayfinderError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            WayfinderError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for WayfinderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            WayfinderError::malformed(err.to_string())
        } else {
            WayfinderError::api(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for WayfinderError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            reqwest_middleware::Error::Middleware(err) => WayfinderError::api(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = WayfinderError::extraction("no json");
        assert!(matches!(err, WayfinderError::ExtractionFailure { .. }));

        let err = WayfinderError::not_found("Atlantis");
        assert!(matches!(err, WayfinderError::NotFound { .. }));

        let err = WayfinderError::validation("empty text");
        assert!(matches!(err, WayfinderError::Validation { .. }));
    }

    #[test]
    fn test_timeout_is_recovered_like_extraction_failure() {
        assert!(WayfinderError::TimeoutExceeded { timeout_ms: 10 }.is_recoverable_extraction());
        assert!(WayfinderError::extraction("bad").is_recoverable_extraction());
        assert!(!WayfinderError::config("bad").is_recoverable_extraction());
    }

    #[test]
    fn test_user_messages() {
        let err = WayfinderError::not_found("Atlantis");
        assert!(err.user_message().contains("Atlantis"));

        let err = WayfinderError::api("connection refused");
        assert!(err.user_message().contains("Unable to connect"));

        let err = WayfinderError::validation("test input");
        assert!(err.user_message().contains("test input"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WayfinderError = io_err.into();
        assert!(matches!(err, WayfinderError::Io { .. }));
    }
}
