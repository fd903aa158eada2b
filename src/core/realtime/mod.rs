//! Realtime upstream provider module.
//!
//! This module provides the abstraction over a remote realtime multimodal
//! session and its Gemini Live implementation.
//!
//! # Architecture
//!
//! - `LiveSession` trait for an open provider session
//! - `LiveConnector` trait for opening sessions, so the relay can be driven
//!   by a mock provider in tests
//! - Provider messages are normalized into [`UpstreamEvent`]s
//!
//! # Example
//!
//! ```rust,ignore
//! use waav_live_relay::core::realtime::{GeminiConnector, LiveConnector, LiveSessionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = LiveSessionConfig {
//!         api_key: "AIza...".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let session = GeminiConnector.open(config).await.unwrap();
//!     session.send_text_turn("Hello").await.unwrap();
//! }
//! ```

mod base;
pub mod gemini;

pub use base::{
    ActivityDetectionConfig, ContextCompression, EndSensitivity, LiveConnector, LiveSession,
    LiveSessionConfig, RealtimeError, RealtimeResult, ResponseModality, StartSensitivity,
    TextSource, UpstreamEvent,
};
pub use gemini::{
    DEFAULT_GEMINI_MODEL, GEMINI_INPUT_SAMPLE_RATE, GEMINI_LIVE_URL, GeminiConnector,
    GeminiLiveSession,
};
