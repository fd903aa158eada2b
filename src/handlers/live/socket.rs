//! Axum WebSocket halves adapted to the relay's client seams.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tracing::debug;

use crate::core::relay::{ClientMessage, ClientSink, ClientSource, RelayError};

/// Receiving half of a client WebSocket.
pub struct WsClientSource(SplitStream<WebSocket>);

impl WsClientSource {
    pub fn new(stream: SplitStream<WebSocket>) -> Self {
        Self(stream)
    }
}

#[async_trait]
impl ClientSource for WsClientSource {
    async fn recv(&mut self) -> Result<Option<ClientMessage>, RelayError> {
        match self.0.next().await {
            Some(Ok(Message::Text(text))) => Ok(Some(ClientMessage::Text(text.to_string()))),
            Some(Ok(Message::Binary(data))) => Ok(Some(ClientMessage::Audio(data))),
            Some(Ok(Message::Ping(_))) => Ok(Some(ClientMessage::Other("ping"))),
            Some(Ok(Message::Pong(_))) => Ok(Some(ClientMessage::Other("pong"))),
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "Client sent close frame");
                Ok(None)
            }
            Some(Err(e)) => Err(RelayError::ClientReceiveFailure(e.to_string())),
            None => Ok(None),
        }
    }
}

/// Sending half of a client WebSocket.
pub struct WsClientSink(SplitSink<WebSocket, Message>);

impl WsClientSink {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self(sink)
    }
}

#[async_trait]
impl ClientSink for WsClientSink {
    async fn send_text(&mut self, text: String) -> Result<(), RelayError> {
        self.0
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| RelayError::ClientSendFailure(e.to_string()))
    }

    async fn send_binary(&mut self, data: Bytes) -> Result<(), RelayError> {
        self.0
            .send(Message::Binary(data))
            .await
            .map_err(|e| RelayError::ClientSendFailure(e.to_string()))
    }
}
