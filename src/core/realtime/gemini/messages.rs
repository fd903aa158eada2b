//! Gemini Live API WebSocket message types.
//!
//! All messages are JSON objects with exactly one top-level key naming the
//! message kind. Field names are camelCase on the wire.
//!
//! # Protocol Overview
//!
//! Client messages (sent to server):
//! - setup - Session configuration, must be the first message
//! - clientContent - Complete conversation turns
//! - realtimeInput - Streaming audio chunks
//!
//! Server messages (received from server):
//! - setupComplete - Setup acknowledged
//! - serverContent - Model output, interruption and turn boundaries
//! - sessionResumptionUpdate - New resumption handle
//! - goAway - Server is about to close the connection
//! - toolCall / toolCallCancellation - Function calling (not used by the relay)
//! - usageMetadata - Token accounting

use base64::prelude::*;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::{model_resource_name, pcm_mime_type};
use crate::core::realtime::base::{
    ActivityDetectionConfig, ContextCompression, EndSensitivity, LiveSessionConfig,
    ResponseModality, StartSensitivity, TextSource, UpstreamEvent,
};

// =============================================================================
// Shared Content Types
// =============================================================================

/// A conversation turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single part of a turn: text or inline binary data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

/// Base64-encoded binary payload with its MIME type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl Blob {
    /// Encode raw PCM audio at the given sample rate.
    pub fn pcm(audio: &[u8], sample_rate: u32) -> Self {
        Self {
            mime_type: pcm_mime_type(sample_rate),
            data: BASE64_STANDARD.encode(audio),
        }
    }
}

// =============================================================================
// Client Messages
// =============================================================================

/// Messages sent from the relay to Gemini.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientEvent {
    Setup(SetupMessage),
    ClientContent(ClientContent),
    RealtimeInput(RealtimeInput),
}

impl ClientEvent {
    /// Build the setup message for a session configuration.
    pub fn setup(config: &LiveSessionConfig) -> Self {
        ClientEvent::Setup(SetupMessage::from_config(config))
    }

    /// A single complete user text turn.
    pub fn user_text(text: &str) -> Self {
        ClientEvent::ClientContent(ClientContent {
            turns: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(text.to_string()),
                    inline_data: None,
                }],
            }],
            turn_complete: true,
        })
    }

    /// A chunk of realtime PCM audio.
    pub fn audio(audio: &[u8], sample_rate: u32) -> Self {
        ClientEvent::RealtimeInput(RealtimeInput {
            audio: Some(Blob::pcm(audio, sample_rate)),
        })
    }

    /// Message kind for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::Setup(_) => "setup",
            ClientEvent::ClientContent(_) => "client_content",
            ClientEvent::RealtimeInput(_) => "realtime_input",
        }
    }
}

/// Session setup, sent once right after the socket opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    /// Model resource name ("models/...")
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_input_config: Option<RealtimeInputConfig>,
    #[serde(default)]
    pub session_resumption: SessionResumptionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window_compression: Option<ContextWindowCompression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<AudioTranscriptionConfig>,
}

impl SetupMessage {
    pub fn from_config(config: &LiveSessionConfig) -> Self {
        let context_window_compression = match config.context_compression {
            ContextCompression::SlidingWindow => Some(ContextWindowCompression {
                sliding_window: SlidingWindow::default(),
            }),
            ContextCompression::Disabled => None,
        };

        Self {
            model: model_resource_name(&config.model),
            generation_config: GenerationConfig {
                response_modalities: vec![config.response_modality],
            },
            realtime_input_config: Some(RealtimeInputConfig {
                automatic_activity_detection: AutomaticActivityDetection::from(
                    &config.activity_detection,
                ),
            }),
            session_resumption: SessionResumptionConfig {
                handle: config.resumption_handle.clone().filter(|h| !h.is_empty()),
            },
            context_window_compression,
            output_audio_transcription: config
                .output_transcription
                .then(AudioTranscriptionConfig::default),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputConfig {
    pub automatic_activity_detection: AutomaticActivityDetection,
}

/// Wire form of [`ActivityDetectionConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomaticActivityDetection {
    pub disabled: bool,
    pub start_of_speech_sensitivity: StartSensitivity,
    pub end_of_speech_sensitivity: EndSensitivity,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl From<&ActivityDetectionConfig> for AutomaticActivityDetection {
    fn from(vad: &ActivityDetectionConfig) -> Self {
        Self {
            disabled: vad.disabled,
            start_of_speech_sensitivity: vad.start_sensitivity,
            end_of_speech_sensitivity: vad.end_sensitivity,
            prefix_padding_ms: vad.prefix_padding_ms,
            silence_duration_ms: vad.silence_duration_ms,
        }
    }
}

/// Empty handle asks for a fresh, resumable session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionResumptionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindowCompression {
    pub sliding_window: SlidingWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidingWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioTranscriptionConfig {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,
}

// =============================================================================
// Server Messages
// =============================================================================

/// A message received from Gemini.
///
/// Every field is optional; the server sets exactly the ones relevant to the
/// message, and unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub session_resumption_update: Option<SessionResumptionUpdate>,
    #[serde(default)]
    pub go_away: Option<GoAway>,
    #[serde(default)]
    pub tool_call: Option<serde_json::Value>,
    #[serde(default)]
    pub tool_call_cancellation: Option<serde_json::Value>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: Option<bool>,
    #[serde(default)]
    pub interrupted: Option<bool>,
    #[serde(default)]
    pub generation_complete: Option<bool>,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResumptionUpdate {
    #[serde(default)]
    pub new_handle: Option<String>,
    #[serde(default)]
    pub resumable: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    /// Remaining time before the server disconnects, e.g. "10s"
    #[serde(default)]
    pub time_left: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: Option<u64>,
    #[serde(default)]
    pub response_token_count: Option<u64>,
    #[serde(default)]
    pub total_token_count: Option<u64>,
}

impl ServerMessage {
    /// Parse a server message from its JSON text.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// Normalize this message into relay events, in forwarding order.
    ///
    /// Order: resumption update, interruption, aggregate text, joined audio,
    /// per-part text, output transcription, turn completion.
    pub fn into_events(self) -> Vec<UpstreamEvent> {
        let mut events = Vec::new();

        if let Some(update) = self.session_resumption_update {
            events.push(UpstreamEvent::ResumptionUpdate {
                handle: update.new_handle.unwrap_or_default(),
                resumable: update.resumable.unwrap_or(false),
            });
        }

        if let Some(go_away) = &self.go_away {
            warn!(
                time_left = go_away.time_left.as_deref().unwrap_or("unknown"),
                "Gemini announced upcoming disconnect"
            );
        }

        if let Some(usage) = &self.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count.unwrap_or(0),
                response_tokens = usage.response_token_count.unwrap_or(0),
                total_tokens = usage.total_token_count.unwrap_or(0),
                "Gemini usage metadata"
            );
        }

        if self.tool_call.is_some() || self.tool_call_cancellation.is_some() {
            info!("Ignoring Gemini tool call message");
        }

        let Some(content) = self.server_content else {
            return events;
        };

        if content.interrupted.unwrap_or(false) {
            events.push(UpstreamEvent::Interrupted);
        }

        if let Some(turn) = content.model_turn {
            let direct: String = turn
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect();
            if !direct.is_empty() {
                events.push(UpstreamEvent::TextFragment {
                    text: direct,
                    source: TextSource::Direct,
                });
            }

            // Every audio part of one message goes out as a single chunk
            let mut audio = BytesMut::new();
            let mut part_texts = Vec::new();
            for part in turn.parts {
                if let Some(blob) = part.inline_data {
                    match BASE64_STANDARD.decode(blob.data.as_bytes()) {
                        Ok(decoded) => audio.extend_from_slice(&decoded),
                        Err(e) => {
                            warn!(mime_type = %blob.mime_type, "Skipping undecodable inline data: {}", e);
                        }
                    }
                }
                if let Some(text) = part.text
                    && !text.is_empty()
                {
                    part_texts.push(text);
                }
            }

            if !audio.is_empty() {
                events.push(UpstreamEvent::AudioData(audio.freeze()));
            }
            events.extend(part_texts.into_iter().map(|text| UpstreamEvent::TextFragment {
                text,
                source: TextSource::ModelTurn,
            }));
        }

        if let Some(text) = content.input_transcription.and_then(|t| t.text)
            && !text.is_empty()
        {
            debug!(transcript = %text, "Gemini input transcription");
        }

        if let Some(text) = content.output_transcription.and_then(|t| t.text)
            && !text.is_empty()
        {
            events.push(UpstreamEvent::TextFragment {
                text,
                source: TextSource::Transcription,
            });
        }

        if content.generation_complete.unwrap_or(false) {
            debug!("Gemini generation complete");
        }

        if content.turn_complete.unwrap_or(false) {
            events.push(UpstreamEvent::TurnComplete);
        }

        events
    }
}
