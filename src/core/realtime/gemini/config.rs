//! Gemini Live API configuration constants and helpers.

use url::Url;

use crate::core::realtime::base::{RealtimeError, RealtimeResult};

/// Gemini Live API WebSocket endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default Gemini Live model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-live-001";

/// Sample rate Gemini accepts for input audio.
pub const GEMINI_INPUT_SAMPLE_RATE: u32 = 16000;

/// Sample rate of the audio Gemini produces.
pub const GEMINI_OUTPUT_SAMPLE_RATE: u32 = 24000;

/// MIME type declared for raw PCM input at the given rate.
#[inline]
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={sample_rate}")
}

/// Model resource name as expected in the setup message.
pub fn model_resource_name(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Build the WebSocket URL with the API key query parameter.
pub fn build_ws_url(endpoint: &str, api_key: &str) -> RealtimeResult<Url> {
    let mut url = Url::parse(endpoint).map_err(|e| {
        RealtimeError::InvalidConfiguration(format!("Invalid endpoint '{endpoint}': {e}"))
    })?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "Endpoint scheme must be ws or wss, got '{other}'"
            )));
        }
    }

    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}
