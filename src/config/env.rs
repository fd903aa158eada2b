use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ServerConfig, TlsConfig};
use crate::core::realtime::{
    ActivityDetectionConfig, DEFAULT_GEMINI_MODEL, GEMINI_INPUT_SAMPLE_RATE, GEMINI_LIVE_URL,
};

/// Every variable read by [`load_from_env`].
pub(super) const ENV_VARS: &[&str] = &[
    "HOST",
    "PORT",
    "TLS_CERT_PATH",
    "TLS_KEY_PATH",
    "GEMINI_API_KEY",
    "GOOGLE_API_KEY",
    "GEMINI_MODEL",
    "GEMINI_LIVE_URL",
    "INPUT_SAMPLE_RATE",
    "OUTPUT_TRANSCRIPTION",
    "VAD_DISABLED",
    "VAD_START_SENSITIVITY",
    "VAD_END_SENSITIVITY",
    "VAD_PREFIX_PADDING_MS",
    "VAD_SILENCE_DURATION_MS",
    "CORS_ALLOWED_ORIGINS",
];

/// Non-empty value of an environment variable.
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional environment variable.
fn parse_var<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                name,
                reason: format!("'{raw}': {e}"),
            })
        })
        .transpose()
}

/// Parse a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
pub(super) fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}

fn bool_var(name: &'static str) -> Result<Option<bool>, ConfigError> {
    var(name).map(|raw| parse_bool(name, &raw)).transpose()
}

/// TLS certificate and key paths, either of which may still be missing.
///
/// The pair is only checked by [`TlsPaths::resolve`], once every layer has
/// been applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct TlsPaths {
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    /// Set when a layer turned TLS on explicitly.
    pub required: bool,
}

impl TlsPaths {
    pub(super) fn from_env() -> Self {
        Self {
            cert_path: var("TLS_CERT_PATH").map(PathBuf::from),
            key_path: var("TLS_KEY_PATH").map(PathBuf::from),
            required: false,
        }
    }

    /// Pair the paths. Neither path means TLS stays off unless it was required.
    pub(super) fn resolve(self, name: &'static str) -> Result<Option<TlsConfig>, ConfigError> {
        match (self.cert_path, self.key_path) {
            (Some(cert_path), Some(key_path)) => Ok(Some(TlsConfig {
                cert_path,
                key_path,
            })),
            (None, None) if !self.required => Ok(None),
            _ => Err(ConfigError::InvalidValue {
                name,
                reason: "cert and key paths must both be set to enable TLS".to_string(),
            }),
        }
    }
}

/// Build a configuration from environment variables and defaults.
///
/// Validation of the final values happens separately so YAML can still fill
/// in what the environment leaves out.
pub(super) fn load_from_env() -> Result<ServerConfig, ConfigError> {
    let mut config = load_without_tls()?;
    config.tls = TlsPaths::from_env().resolve("TLS_CERT_PATH/TLS_KEY_PATH")?;
    Ok(config)
}

/// Everything but TLS, which a later layer may still complete.
pub(super) fn load_without_tls() -> Result<ServerConfig, ConfigError> {
    let defaults = ActivityDetectionConfig::default();
    let vad = ActivityDetectionConfig {
        disabled: bool_var("VAD_DISABLED")?.unwrap_or(defaults.disabled),
        start_sensitivity: parse_var("VAD_START_SENSITIVITY")?
            .unwrap_or(defaults.start_sensitivity),
        end_sensitivity: parse_var("VAD_END_SENSITIVITY")?.unwrap_or(defaults.end_sensitivity),
        prefix_padding_ms: parse_var("VAD_PREFIX_PADDING_MS")?
            .unwrap_or(defaults.prefix_padding_ms),
        silence_duration_ms: parse_var("VAD_SILENCE_DURATION_MS")?
            .unwrap_or(defaults.silence_duration_ms),
    };

    Ok(ServerConfig {
        host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        port: parse_var("PORT")?.unwrap_or(8000),
        tls: None,
        gemini_api_key: var("GEMINI_API_KEY")
            .or_else(|| var("GOOGLE_API_KEY"))
            .unwrap_or_default(),
        gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        gemini_live_url: var("GEMINI_LIVE_URL").unwrap_or_else(|| GEMINI_LIVE_URL.to_string()),
        input_sample_rate: parse_var("INPUT_SAMPLE_RATE")?.unwrap_or(GEMINI_INPUT_SAMPLE_RATE),
        output_transcription: bool_var("OUTPUT_TRANSCRIPTION")?.unwrap_or(false),
        vad,
        cors_allowed_origins: Some(var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string())),
    })
}
