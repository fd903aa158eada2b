use std::path::PathBuf;
use std::str::FromStr;

use super::env::TlsPaths;
use super::yaml::{TlsYaml, YamlConfig};
use super::{ConfigError, ServerConfig};
use crate::core::realtime::{EndSensitivity, StartSensitivity};

fn parse_field<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>()
        .map_err(|reason| ConfigError::InvalidValue { name, reason })
}

/// Apply YAML values on top of an environment-derived configuration.
///
/// Only keys present in the YAML are applied. TLS paths are merged into `tls`
/// and left for the caller to resolve.
pub(super) fn apply_yaml(
    config: &mut ServerConfig,
    tls: &mut TlsPaths,
    yaml: YamlConfig,
) -> Result<(), ConfigError> {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls_yaml) = server.tls {
            apply_tls(tls, tls_yaml);
        }
    }

    if let Some(gemini) = yaml.gemini {
        if let Some(api_key) = gemini.api_key.filter(|k| !k.is_empty()) {
            config.gemini_api_key = api_key;
        }
        if let Some(model) = gemini.model {
            config.gemini_model = model;
        }
        if let Some(live_url) = gemini.live_url {
            config.gemini_live_url = live_url;
        }
        if let Some(rate) = gemini.input_sample_rate {
            config.input_sample_rate = rate;
        }
        if let Some(enabled) = gemini.output_transcription {
            config.output_transcription = enabled;
        }
    }

    if let Some(vad) = yaml.vad {
        if let Some(disabled) = vad.disabled {
            config.vad.disabled = disabled;
        }
        if let Some(raw) = vad.start_sensitivity {
            config.vad.start_sensitivity =
                parse_field::<StartSensitivity>("vad.start_sensitivity", &raw)?;
        }
        if let Some(raw) = vad.end_sensitivity {
            config.vad.end_sensitivity =
                parse_field::<EndSensitivity>("vad.end_sensitivity", &raw)?;
        }
        if let Some(ms) = vad.prefix_padding_ms {
            config.vad.prefix_padding_ms = ms;
        }
        if let Some(ms) = vad.silence_duration_ms {
            config.vad.silence_duration_ms = ms;
        }
    }

    if let Some(security) = yaml.security
        && let Some(origins) = security.cors_allowed_origins
    {
        config.cors_allowed_origins = Some(origins);
    }

    Ok(())
}

fn apply_tls(tls: &mut TlsPaths, yaml: TlsYaml) {
    match yaml.enabled {
        Some(false) => {
            *tls = TlsPaths::default();
            return;
        }
        Some(true) => tls.required = true,
        None => {}
    }

    if let Some(cert_path) = yaml.cert_path {
        tls.cert_path = Some(PathBuf::from(cert_path));
    }
    if let Some(key_path) = yaml.key_path {
        tls.key_path = Some(PathBuf::from(key_path));
    }
}
