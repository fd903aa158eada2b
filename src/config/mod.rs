//! Configuration module for the live relay server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Applying YAML overrides on top of the environment
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use waav_live_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::realtime::{
    ActivityDetectionConfig, ContextCompression, LiveSessionConfig, ResponseModality,
};

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse YAML config: {0}")]
    Parse(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all settings needed to run the relay:
/// - Listener address and optional TLS
/// - Gemini credentials, model and endpoint
/// - Voice activity detection parameters sent at session setup
/// - Security settings (CORS)
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Gemini settings
    /// Gemini API key (GEMINI_API_KEY, falling back to GOOGLE_API_KEY)
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Live API WebSocket endpoint
    pub gemini_live_url: String,
    /// Sample rate declared for client microphone audio
    pub input_sample_rate: u32,
    /// Ask Gemini to transcribe its audio replies
    pub output_transcription: bool,

    // Voice activity detection
    pub vad: ActivityDetectionConfig,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: "*"
    pub cors_allowed_origins: Option<String>,
}

/// Implement Drop to zeroize the API key when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.gemini_api_key.zeroize();
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_live_url", &self.gemini_live_url)
            .field("input_sample_rate", &self.input_sample_rate)
            .field("output_transcription", &self.output_transcription)
            .field("vad", &self.vad)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded into the environment by `main` before this is
    /// called. Missing optional variables fall back to defaults; a missing API
    /// key is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = env::load_from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;

        let mut config = env::load_without_tls()?;
        let mut tls = env::TlsPaths::from_env();
        merge::apply_yaml(&mut config, &mut tls, yaml_config)?;
        config.tls = tls.resolve("server.tls")?;

        validation::validate(&config)?;

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Session configuration sent to Gemini for every new relay.
    pub fn live_session_config(&self) -> LiveSessionConfig {
        LiveSessionConfig {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            endpoint: self.gemini_live_url.clone(),
            response_modality: ResponseModality::Audio,
            activity_detection: self.vad.clone(),
            resumption_handle: None,
            context_compression: ContextCompression::SlidingWindow,
            output_transcription: self.output_transcription,
        }
    }
}
