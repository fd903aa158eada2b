//! Gemini Live API module.
//!
//! This module provides realtime audio-to-audio streaming over the Gemini
//! Live `BidiGenerateContent` WebSocket API.
//!
//! # Features
//!
//! - Bidirectional audio streaming
//! - Server-side voice activity detection with interruption events
//! - Transcription of the generated audio
//! - Session resumption handles
//! - Sliding-window context compression
//!
//! # Audio Format
//!
//! Input audio is PCM 16-bit signed little-endian at 16kHz. Gemini answers
//! with PCM 16-bit at 24kHz.

mod client;
mod config;
mod messages;

pub use client::{GeminiConnector, GeminiLiveSession};
pub use config::{
    DEFAULT_GEMINI_MODEL, GEMINI_INPUT_SAMPLE_RATE, GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE,
    build_ws_url, model_resource_name, pcm_mime_type,
};
pub use messages::{
    AutomaticActivityDetection, Blob, ClientContent, ClientEvent, Content, Part, RealtimeInput,
    ServerContent, ServerMessage, SetupMessage,
};
