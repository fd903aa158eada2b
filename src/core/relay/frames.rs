//! Frames written back to the client.

use bytes::Bytes;

use super::channel::ClientSink;
use super::error::RelayError;
use crate::core::realtime::TextSource;

/// Tag for model text.
pub const TEXT_TAG: &str = "[TEXT_FROM_GEMINI]";
/// Tag for transcriptions of the model's audio.
pub const TRANSCRIPT_TAG: &str = "[TRANSCRIPT_FROM_GEMINI]";
/// Tag for errors reported by the upstream session.
pub const ERROR_TAG: &str = "[ERROR_FROM_GEMINI]";

/// Tells the client to stop local audio playback.
pub const INTERRUPT_PLAYBACK: &str = r#"{"action": "interrupt_playback"}"#;

/// A single frame for the client, always sent whole.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Audio bytes, forwarded verbatim as a binary frame
    RawAudio(Bytes),
    /// Fixed control JSON, sent as a text frame
    ControlJson(&'static str),
    /// `"<tag>: <text>"` text frame
    TaggedText { tag: &'static str, text: String },
}

impl OutboundFrame {
    /// Tagged frame for a text fragment.
    pub fn text(source: TextSource, text: String) -> Self {
        let tag = match source {
            TextSource::Transcription => TRANSCRIPT_TAG,
            TextSource::Direct | TextSource::ModelTurn => TEXT_TAG,
        };
        OutboundFrame::TaggedText { tag, text }
    }

    pub fn error(message: String) -> Self {
        OutboundFrame::TaggedText {
            tag: ERROR_TAG,
            text: message,
        }
    }

    pub fn interrupt() -> Self {
        OutboundFrame::ControlJson(INTERRUPT_PLAYBACK)
    }

    /// Write this frame to the client.
    pub async fn send_to<K: ClientSink + ?Sized>(self, sink: &mut K) -> Result<(), RelayError> {
        match self {
            OutboundFrame::RawAudio(audio) => sink.send_binary(audio).await,
            OutboundFrame::ControlJson(json) => sink.send_text(json.to_string()).await,
            OutboundFrame::TaggedText { tag, text } => sink.send_text(format!("{tag}: {text}")).await,
        }
    }
}
