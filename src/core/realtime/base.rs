//! Base traits and types for live upstream sessions.
//!
//! This module defines the provider-neutral surface the relay talks to: the
//! session configuration sent once at open time, the normalized
//! [`UpstreamEvent`] stream, and the [`LiveSession`] / [`LiveConnector`]
//! traits implemented by concrete providers.
//!
//! # Audio Format
//!
//! Input audio is raw PCM 16-bit little-endian at a declared sample rate
//! (16kHz by default). Output audio is forwarded verbatim as the provider
//! produced it.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::gemini::{DEFAULT_GEMINI_MODEL, GEMINI_LIVE_URL};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to an upstream live session.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for upstream operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Events
// =============================================================================

/// Which part of a provider message produced a text fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    /// Aggregate text of the whole message
    Direct,
    /// A single text part inside the model turn
    ModelTurn,
    /// Transcription of the generated audio
    Transcription,
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSource::Direct => write!(f, "direct"),
            TextSource::ModelTurn => write!(f, "model_turn"),
            TextSource::Transcription => write!(f, "transcription"),
        }
    }
}

/// A normalized event produced by an upstream session.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    /// Raw audio produced by the model
    AudioData(Bytes),
    /// Text produced by the model or its transcriber
    TextFragment { text: String, source: TextSource },
    /// The user started speaking over the model's audio
    Interrupted,
    /// A new session resumption handle
    ResumptionUpdate { handle: String, resumable: bool },
    /// Error reported by the provider
    Error(String),
    /// The model finished its turn
    TurnComplete,
}

// =============================================================================
// Configuration Types
// =============================================================================

/// Response modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    #[default]
    Audio,
}

/// How eagerly the provider decides that speech has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StartSensitivity {
    #[default]
    #[serde(rename = "START_SENSITIVITY_HIGH")]
    High,
    #[serde(rename = "START_SENSITIVITY_LOW")]
    Low,
}

/// How eagerly the provider decides that speech has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EndSensitivity {
    #[serde(rename = "END_SENSITIVITY_HIGH")]
    High,
    #[default]
    #[serde(rename = "END_SENSITIVITY_LOW")]
    Low,
}

/// Parse `high` / `low`, optionally carrying the wire prefix.
fn parse_sensitivity(value: &str, prefix: &str) -> Option<bool> {
    let upper = value.trim().to_ascii_uppercase();
    match upper.strip_prefix(prefix).unwrap_or(upper.as_str()) {
        "HIGH" => Some(true),
        "LOW" => Some(false),
        _ => None,
    }
}

impl FromStr for StartSensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_sensitivity(s, "START_SENSITIVITY_") {
            Some(true) => Ok(Self::High),
            Some(false) => Ok(Self::Low),
            None => Err(format!("unknown start sensitivity '{s}' (expected high or low)")),
        }
    }
}

impl FromStr for EndSensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_sensitivity(s, "END_SENSITIVITY_") {
            Some(true) => Ok(Self::High),
            Some(false) => Ok(Self::Low),
            None => Err(format!("unknown end sensitivity '{s}' (expected high or low)")),
        }
    }
}

/// Server-side voice activity detection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDetectionConfig {
    /// Turn automatic detection off entirely
    pub disabled: bool,
    pub start_sensitivity: StartSensitivity,
    pub end_sensitivity: EndSensitivity,
    /// Audio kept before detected speech start (ms)
    pub prefix_padding_ms: u32,
    /// Silence required before end of speech (ms)
    pub silence_duration_ms: u32,
}

impl Default for ActivityDetectionConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            start_sensitivity: StartSensitivity::High,
            end_sensitivity: EndSensitivity::Low,
            prefix_padding_ms: 20,
            silence_duration_ms: 100,
        }
    }
}

/// Context window compression policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextCompression {
    /// Drop the oldest turns once the window fills up
    #[default]
    SlidingWindow,
    Disabled,
}

/// Configuration passed once when a live session is opened.
///
/// Not renegotiable mid-session.
#[derive(Clone)]
pub struct LiveSessionConfig {
    /// API key for authentication
    pub api_key: String,
    /// Model identifier (e.g., "gemini-2.0-flash-live-001")
    pub model: String,
    /// WebSocket endpoint of the provider
    pub endpoint: String,
    pub response_modality: ResponseModality,
    pub activity_detection: ActivityDetectionConfig,
    /// Handle of a previous session to resume, if any
    pub resumption_handle: Option<String>,
    pub context_compression: ContextCompression,
    /// Ask the provider to transcribe its own audio output
    pub output_transcription: bool,
}

impl Default for LiveSessionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: GEMINI_LIVE_URL.to_string(),
            response_modality: ResponseModality::Audio,
            activity_detection: ActivityDetectionConfig::default(),
            resumption_handle: None,
            context_compression: ContextCompression::SlidingWindow,
            output_transcription: false,
        }
    }
}

impl fmt::Debug for LiveSessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSessionConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("response_modality", &self.response_modality)
            .field("activity_detection", &self.activity_detection)
            .field("resumption_handle", &self.resumption_handle)
            .field("context_compression", &self.context_compression)
            .field("output_transcription", &self.output_transcription)
            .finish()
    }
}

// =============================================================================
// Base Traits
// =============================================================================

/// An open upstream live session.
///
/// All methods take `&self` so the inbound and outbound halves of a relay
/// can drive the same session concurrently.
#[async_trait]
pub trait LiveSession: Send + Sync {
    /// Submit one complete user text turn.
    ///
    /// May suspend until the provider connection accepts the write.
    async fn send_text_turn(&self, text: &str) -> RealtimeResult<()>;

    /// Stream a chunk of raw PCM audio tagged with its sample rate.
    async fn send_audio_chunk(&self, audio: Bytes, sample_rate: u32) -> RealtimeResult<()>;

    /// Events of the current model turn.
    ///
    /// The stream ends after [`UpstreamEvent::TurnComplete`]; call again to
    /// receive the next turn. A broken session yields an `Err` item.
    fn receive(&self) -> BoxStream<'_, RealtimeResult<UpstreamEvent>>;

    /// Release the provider connection. Calling it again is a no-op.
    async fn close(&self) -> RealtimeResult<()>;

    /// Check if the session is connected and accepting input.
    fn is_ready(&self) -> bool;
}

/// Opens live sessions for a provider.
#[async_trait]
pub trait LiveConnector: Send + Sync {
    /// Open a session with the given configuration.
    async fn open(&self, config: LiveSessionConfig) -> RealtimeResult<Box<dyn LiveSession>>;
}
