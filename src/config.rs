//! Configuration management for Wayfinder
//!
//! Handles loading configuration from a TOML file and `WAYFINDER__`
//! environment variables, and validates all settings.

use crate::WayfinderError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for Wayfinder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WayfinderConfig {
    /// Language model used by the extraction cascade
    pub language_model: LanguageModelConfig,
    /// Geocoding and routing provider
    pub mapbox: MapboxConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// HTTP server settings
    pub server: ServerConfig,
}

/// Language model settings. Without an API key extraction runs offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageModelConfig {
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Time budget for one extraction in milliseconds
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
    /// Ask for a function call instead of free-text JSON
    #[serde(default = "default_use_function_calling")]
    pub use_function_calling: bool,
}

/// Mapbox geocoding and directions settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapboxConfig {
    pub access_token: Option<String>,
    #[serde(default = "default_mapbox_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_mapbox_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_mapbox_max_retries")]
    pub max_retries: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

// Default value functions
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_ms() -> u64 {
    10_000
}

fn default_use_function_calling() -> bool {
    true
}

fn default_mapbox_base_url() -> String {
    "https://api.mapbox.com".to_string()
}

fn default_mapbox_timeout() -> u32 {
    30
}

fn default_mapbox_max_retries() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

impl Default for LanguageModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_ms: default_llm_timeout_ms(),
            use_function_calling: default_use_function_calling(),
        }
    }
}

impl Default for MapboxConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            base_url: default_mapbox_base_url(),
            timeout_seconds: default_mapbox_timeout(),
            max_retries: default_mapbox_max_retries(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

impl LanguageModelConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether a model can be called at all
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

impl WayfinderConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // WAYFINDER__SECTION__KEY overrides, e.g. WAYFINDER__MAPBOX__ACCESS_TOKEN
        builder = builder.add_source(
            Environment::with_prefix("WAYFINDER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: WayfinderConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wayfinder").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.language_model.base_url.is_empty() {
            self.language_model.base_url = default_llm_base_url();
        }
        if self.language_model.model.is_empty() {
            self.language_model.model = default_llm_model();
        }
        if self.language_model.timeout_ms == 0 {
            self.language_model.timeout_ms = default_llm_timeout_ms();
        }
        if self.mapbox.base_url.is_empty() {
            self.mapbox.base_url = default_mapbox_base_url();
        }
        if self.mapbox.timeout_seconds == 0 {
            self.mapbox.timeout_seconds = default_mapbox_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.server.port == 0 {
            self.server.port = default_server_port();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and access tokens
    pub fn validate_api_keys(&self) -> Result<()> {
        if let Some(api_key) = &self.language_model.api_key {
            if api_key.is_empty() {
                return Err(WayfinderError::config(
                    "Language model API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }
        }

        if let Some(token) = &self.mapbox.access_token {
            if token.len() < 8 {
                return Err(WayfinderError::config(
                    "Mapbox access token appears to be invalid (too short). Please check your token.",
                )
                .into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if !(100..=120_000).contains(&self.language_model.timeout_ms) {
            return Err(WayfinderError::config(
                "Language model timeout must be between 100 and 120000 ms",
            )
            .into());
        }

        if self.mapbox.timeout_seconds > 300 {
            return Err(WayfinderError::config("Mapbox timeout cannot exceed 300 seconds").into());
        }

        if self.mapbox.max_retries > 10 {
            return Err(WayfinderError::config("Mapbox max retries cannot exceed 10").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WayfinderError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WayfinderError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Language model", &self.language_model.base_url),
            ("Mapbox", &self.mapbox.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WayfinderError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
