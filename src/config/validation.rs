use url::Url;

use super::{ConfigError, ServerConfig};

/// Check the merged configuration before the server starts.
pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.gemini_api_key.trim().is_empty() {
        return Err(ConfigError::Missing(
            "GEMINI_API_KEY (or GOOGLE_API_KEY, or gemini.api_key in YAML)",
        ));
    }

    if config.port == 0 {
        return Err(ConfigError::InvalidValue {
            name: "port",
            reason: "must be non-zero".to_string(),
        });
    }

    if config.gemini_model.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            name: "gemini model",
            reason: "must not be empty".to_string(),
        });
    }

    if config.input_sample_rate == 0 {
        return Err(ConfigError::InvalidValue {
            name: "input_sample_rate",
            reason: "must be non-zero".to_string(),
        });
    }

    validate_live_url(&config.gemini_live_url)
}

fn validate_live_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        name: "gemini live url",
        reason: format!("'{raw}': {e}"),
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(ConfigError::InvalidValue {
            name: "gemini live url",
            reason: format!("scheme must be ws or wss, got '{other}'"),
        }),
    }
}
