//! WebSocket Mock Server for the Gemini Live API
//!
//! Accepts the `setup` handshake, records every client message and answers
//! with scripted server frames.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        Message,
        handshake::server::{ErrorResponse, Request, Response},
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};

type MockResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// One frame the mock sends to the client.
#[derive(Debug, Clone)]
pub enum MockFrame {
    /// JSON in a text frame
    Json(Value),
    /// JSON in a binary frame, as Gemini sometimes sends it
    BinaryJson(Value),
    /// Close the connection with the given code and reason
    Close(u16, String),
}

impl MockFrame {
    /// A model audio chunk carrying `data` (base64).
    pub fn audio(data: &str) -> Self {
        MockFrame::Json(json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [{ "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": data } }]
                }
            }
        }))
    }

    pub fn turn_complete() -> Self {
        MockFrame::Json(json!({ "serverContent": { "turnComplete": true } }))
    }

    pub fn interrupted() -> Self {
        MockFrame::Json(json!({ "serverContent": { "interrupted": true } }))
    }

    pub fn resumption(handle: &str) -> Self {
        MockFrame::Json(json!({
            "sessionResumptionUpdate": { "newHandle": handle, "resumable": true }
        }))
    }
}

/// What the mock does on each connection.
#[derive(Debug, Clone, Default)]
pub struct GeminiScript {
    /// Close with this code instead of acknowledging setup
    pub reject_setup: Option<(u16, String)>,
    /// Never acknowledge setup
    pub ignore_setup: bool,
    /// Frames sent right after `setupComplete`
    pub after_setup: Vec<MockFrame>,
    /// Frames sent after every `clientContent` message
    pub on_client_content: Vec<MockFrame>,
}

#[derive(Default)]
struct MockState {
    script: GeminiScript,
    received: Mutex<Vec<Value>>,
    request_uris: Mutex<Vec<String>>,
    connections: AtomicUsize,
    client_closed: AtomicBool,
}

/// Running mock server; stops when dropped.
pub struct GeminiMockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl GeminiMockServer {
    pub async fn start(script: GeminiScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock listener");
        let addr = listener.local_addr().expect("mock listener address");
        let state = Arc::new(MockState {
            script,
            ..Default::default()
        });

        let accept_state = state.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, state).await;
                });
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Endpoint to put in `LiveSessionConfig::endpoint`.
    pub fn endpoint(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Client messages received so far, parsed as JSON.
    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().clone()
    }

    /// Received messages carrying the given top-level key.
    pub fn received_of(&self, key: &str) -> Vec<Value> {
        self.received()
            .into_iter()
            .filter_map(|m| m.get(key).cloned())
            .collect()
    }

    pub fn request_uris(&self) -> Vec<String> {
        self.state.request_uris.lock().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Whether a client sent a close frame.
    pub fn client_closed(&self) -> bool {
        self.state.client_closed.load(Ordering::SeqCst)
    }
}

impl Drop for GeminiMockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<MockState>) -> MockResult<()> {
    let uri_state = state.clone();
    let ws_stream = accept_hdr_async(
        stream,
        move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            uri_state.request_uris.lock().push(req.uri().to_string());
            Ok(resp)
        },
    )
    .await?;
    state.connections.fetch_add(1, Ordering::SeqCst);

    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        let text = match msg? {
            Message::Text(text) => text.to_string(),
            Message::Binary(data) => String::from_utf8(data.to_vec())?,
            Message::Close(_) => {
                state.client_closed.store(true, Ordering::SeqCst);
                break;
            }
            _ => continue,
        };

        let value: Value = serde_json::from_str(&text)?;
        state.received.lock().push(value.clone());

        if value.get("setup").is_some() {
            if let Some((code, reason)) = &state.script.reject_setup {
                send_frame(&mut write, &MockFrame::Close(*code, reason.clone())).await?;
                break;
            }
            if state.script.ignore_setup {
                continue;
            }
            write
                .send(Message::Text(json!({ "setupComplete": {} }).to_string().into()))
                .await?;
            for frame in &state.script.after_setup {
                send_frame(&mut write, frame).await?;
            }
        } else if value.get("clientContent").is_some() {
            for frame in &state.script.on_client_content {
                send_frame(&mut write, frame).await?;
            }
        }
    }

    Ok(())
}

async fn send_frame<S>(write: &mut S, frame: &MockFrame) -> MockResult<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let message = match frame {
        MockFrame::Json(value) => Message::Text(value.to_string().into()),
        MockFrame::BinaryJson(value) => Message::Binary(value.to_string().into_bytes().into()),
        MockFrame::Close(code, reason) => Message::Close(Some(CloseFrame {
            code: CloseCode::from(*code),
            reason: reason.clone().into(),
        })),
    };
    write.send(message).await?;
    Ok(())
}
