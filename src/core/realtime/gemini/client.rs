//! Gemini Live API client implementation.
//!
//! This module provides [`GeminiLiveSession`], a [`LiveSession`] backed by the
//! Gemini Live `BidiGenerateContent` WebSocket API.
//!
//! # API Reference
//!
//! - Endpoint: `wss://generativelanguage.googleapis.com/ws/...BidiGenerateContent?key=<key>`
//! - Protocol: WebSocket with JSON messages (server messages may arrive as binary frames)
//! - Input audio: PCM 16-bit, 16kHz, mono, little-endian, base64 encoded
//! - Output audio: PCM 16-bit, 24kHz, mono, little-endian, base64 encoded
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use waav_live_relay::core::realtime::{GeminiLiveSession, LiveSession, LiveSessionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = LiveSessionConfig {
//!         api_key: "AIza...".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let session = GeminiLiveSession::connect(config).await.unwrap();
//!     session.send_text_turn("Hello").await.unwrap();
//!
//!     let mut turn = session.receive();
//!     while let Some(event) = turn.next().await {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::config::build_ws_url;
use super::messages::{ClientEvent, ServerMessage};
use crate::core::realtime::base::{
    LiveConnector, LiveSession, LiveSessionConfig, RealtimeError, RealtimeResult, UpstreamEvent,
};

/// Channel capacity for outgoing WebSocket messages.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for decoded server events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long to wait for `setupComplete` after sending `setup`.
const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `close` waits for the connection task to send its close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Extract the JSON text of a data frame.
///
/// Gemini delivers its JSON in binary frames as well as text frames.
fn frame_json(msg: &Message) -> Option<&str> {
    match msg {
        Message::Text(text) => Some(text.as_str()),
        Message::Binary(data) => match std::str::from_utf8(data) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Ignoring non-UTF-8 binary frame from Gemini: {}", e);
                None
            }
        },
        _ => None,
    }
}

/// Describe a close frame, or `None` when the close was a normal one.
fn abnormal_close_reason(frame: Option<&CloseFrame>) -> Option<String> {
    match frame {
        Some(frame) if frame.code != CloseCode::Normal => Some(format!(
            "connection closed ({}): {}",
            u16::from(frame.code),
            frame.reason.as_str()
        )),
        _ => None,
    }
}

/// An open Gemini Live session.
pub struct GeminiLiveSession {
    /// Model the session was opened with
    model: String,
    /// Cleared by the connection task when the socket goes away
    connected: Arc<AtomicBool>,
    ws_sender: Mutex<Option<mpsc::Sender<ClientEvent>>>,
    events: tokio::sync::Mutex<mpsc::Receiver<RealtimeResult<UpstreamEvent>>>,
    connection_handle: Mutex<Option<JoinHandle<()>>>,
}

impl GeminiLiveSession {
    /// Connect, send the setup message and wait for the server to accept it.
    pub async fn connect(config: LiveSessionConfig) -> RealtimeResult<Self> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let url = build_ws_url(&config.endpoint, &config.api_key)?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        info!(model = %config.model, "Connected to Gemini Live API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        let setup = serde_json::to_string(&ClientEvent::setup(&config))
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
        ws_sink
            .send(Message::Text(setup.into()))
            .await
            .map_err(|e| RealtimeError::WebSocketError(e.to_string()))?;

        match tokio::time::timeout(SETUP_TIMEOUT, Self::await_setup_complete(&mut ws_stream)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(RealtimeError::Timeout(
                    "no setupComplete from Gemini".to_string(),
                ));
            }
        }

        debug!("Gemini session setup complete");

        let (tx, mut rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));
        let task_connected = connected.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Handle outgoing messages
                    outgoing = rx.recv() => {
                        let Some(event) = outgoing else {
                            // Every sender is gone: the session is closing
                            if let Err(e) = ws_sink.send(Message::Close(None)).await {
                                debug!("Failed to send close frame: {}", e);
                            }
                            break;
                        };

                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                error!("Failed to serialize {} message: {}", event.kind(), e);
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            error!("Failed to send WebSocket message: {}", e);
                            let _ = event_tx
                                .send(Err(RealtimeError::WebSocketError(e.to_string())))
                                .await;
                            break;
                        }
                    }

                    // Handle incoming messages
                    incoming = ws_stream.next() => {
                        let msg = match incoming {
                            Some(Ok(msg)) => msg,
                            Some(Err(e)) => {
                                error!("WebSocket error: {}", e);
                                let _ = event_tx
                                    .send(Err(RealtimeError::WebSocketError(e.to_string())))
                                    .await;
                                break;
                            }
                            None => {
                                info!("Gemini WebSocket stream ended");
                                break;
                            }
                        };

                        let text = match &msg {
                            Message::Ping(data) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data.clone())).await {
                                    error!("Failed to send pong: {}", e);
                                }
                                continue;
                            }
                            Message::Close(frame) => {
                                match abnormal_close_reason(frame.as_ref()) {
                                    Some(reason) => {
                                        warn!("Gemini {}", reason);
                                        let _ = event_tx.send(Ok(UpstreamEvent::Error(reason))).await;
                                    }
                                    None => info!("WebSocket closed by Gemini"),
                                }
                                break;
                            }
                            other => match frame_json(other) {
                                Some(text) => text,
                                None => continue,
                            },
                        };

                        let server_msg = match ServerMessage::parse(text) {
                            Ok(m) => m,
                            Err(e) => {
                                warn!("Failed to parse Gemini message: {} - {}", e, text);
                                continue;
                            }
                        };

                        let mut receiver_gone = false;
                        for event in server_msg.into_events() {
                            if event_tx.send(Ok(event)).await.is_err() {
                                receiver_gone = true;
                                break;
                            }
                        }
                        if receiver_gone {
                            debug!("Event receiver dropped, ending connection task");
                            break;
                        }
                    }
                }
            }

            task_connected.store(false, Ordering::SeqCst);
            info!("Gemini Live connection task ended");
        });

        Ok(Self {
            model: config.model,
            connected,
            ws_sender: Mutex::new(Some(tx)),
            events: tokio::sync::Mutex::new(event_rx),
            connection_handle: Mutex::new(Some(handle)),
        })
    }

    /// Model the session was opened with.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn await_setup_complete(stream: &mut SplitStream<WsStream>) -> RealtimeResult<()> {
        while let Some(msg) = stream.next().await {
            let msg = msg.map_err(|e| RealtimeError::WebSocketError(e.to_string()))?;

            if let Message::Close(frame) = &msg {
                let reason = frame
                    .as_ref()
                    .map(|f| format!("{}: {}", u16::from(f.code), f.reason.as_str()))
                    .unwrap_or_else(|| "no reason given".to_string());
                return Err(RealtimeError::ConnectionFailed(format!(
                    "Gemini closed the connection during setup ({reason})"
                )));
            }

            let Some(text) = frame_json(&msg) else {
                continue;
            };

            match ServerMessage::parse(text) {
                Ok(server_msg) if server_msg.is_setup_complete() => return Ok(()),
                Ok(_) => debug!("Ignoring message received before setupComplete"),
                Err(e) => warn!("Failed to parse Gemini message during setup: {}", e),
            }
        }

        Err(RealtimeError::ConnectionFailed(
            "connection ended before setup completed".to_string(),
        ))
    }

    /// Queue a message for the connection task.
    async fn send_event(&self, event: ClientEvent) -> RealtimeResult<()> {
        if !self.is_ready() {
            return Err(RealtimeError::NotConnected);
        }

        let sender = self
            .ws_sender
            .lock()
            .clone()
            .ok_or(RealtimeError::NotConnected)?;

        sender
            .send(event)
            .await
            .map_err(|e| RealtimeError::WebSocketError(e.to_string()))
    }
}

#[async_trait]
impl LiveSession for GeminiLiveSession {
    async fn send_text_turn(&self, text: &str) -> RealtimeResult<()> {
        self.send_event(ClientEvent::user_text(text)).await
    }

    async fn send_audio_chunk(&self, audio: Bytes, sample_rate: u32) -> RealtimeResult<()> {
        self.send_event(ClientEvent::audio(&audio, sample_rate))
            .await
    }

    fn receive(&self) -> BoxStream<'_, RealtimeResult<UpstreamEvent>> {
        Box::pin(async_stream::stream! {
            let mut events = self.events.lock().await;
            loop {
                match events.recv().await {
                    Some(Ok(event)) => {
                        let turn_done = matches!(event, UpstreamEvent::TurnComplete);
                        yield Ok(event);
                        if turn_done {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        yield Err(e);
                        break;
                    }
                    None => {
                        yield Err(RealtimeError::NotConnected);
                        break;
                    }
                }
            }
        })
    }

    async fn close(&self) -> RealtimeResult<()> {
        // Dropping the last sender makes the connection task send a close frame
        let sender = self.ws_sender.lock().take();
        let handle = self.connection_handle.lock().take();
        drop(sender);

        let Some(mut handle) = handle else {
            return Ok(());
        };

        match tokio::time::timeout(CLOSE_TIMEOUT, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Gemini connection task failed: {}", e),
            Err(_) => {
                warn!("Gemini connection task did not stop in time, aborting");
                handle.abort();
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        info!("Disconnected from Gemini Live API");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.ws_sender.lock().is_some()
    }
}

impl Drop for GeminiLiveSession {
    fn drop(&mut self) {
        if let Some(handle) = self.connection_handle.lock().take() {
            handle.abort();
        }
    }
}

/// Opens [`GeminiLiveSession`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiConnector;

#[async_trait]
impl LiveConnector for GeminiConnector {
    async fn open(&self, config: LiveSessionConfig) -> RealtimeResult<Box<dyn LiveSession>> {
        let session = GeminiLiveSession::connect(config).await?;
        Ok(Box::new(session))
    }
}

// =============================================================================
// Tests
// =============================================================================
