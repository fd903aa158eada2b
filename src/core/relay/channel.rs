//! Client-facing side of a relay.
//!
//! The relay does not depend on a socket library directly. The transport
//! layer implements [`ClientSource`] and [`ClientSink`] for its read and
//! write halves.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::RelayError;

/// One message received from the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// A conversational text turn
    Text(String),
    /// Raw PCM audio
    Audio(Bytes),
    /// A payload kind the relay does not act on (ping, pong, ...)
    Other(&'static str),
}

/// Read half of the client connection.
#[async_trait]
pub trait ClientSource: Send {
    /// Wait for the next client message.
    ///
    /// `Ok(None)` means the client disconnected.
    async fn recv(&mut self) -> Result<Option<ClientMessage>, RelayError>;
}

/// Write half of the client connection.
#[async_trait]
pub trait ClientSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), RelayError>;

    async fn send_binary(&mut self, data: Bytes) -> Result<(), RelayError>;
}
