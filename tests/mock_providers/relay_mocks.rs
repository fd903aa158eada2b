//! In-process doubles for both ends of a relay.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use waav_live_relay::core::realtime::{
    LiveConnector, LiveSession, LiveSessionConfig, RealtimeError, RealtimeResult, UpstreamEvent,
};
use waav_live_relay::core::relay::{ClientMessage, ClientSink, ClientSource, RelayError};

type Turn = Vec<RealtimeResult<UpstreamEvent>>;

struct UpstreamInner {
    texts: Mutex<Vec<String>>,
    audio: Mutex<Vec<(Bytes, u32)>>,
    closes: AtomicUsize,
    fail_sends: AtomicBool,
    replies: Mutex<HashMap<String, Turn>>,
    turn_tx: mpsc::UnboundedSender<Turn>,
    turn_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Turn>>,
}

/// Scripted upstream live session.
///
/// Records every send and yields one queued turn per `receive` call. Turns
/// are queued directly with [`MockUpstream::push_turn`] or in reaction to a
/// text turn registered with [`MockUpstream::reply_to`].
#[derive(Clone)]
pub struct MockUpstream {
    inner: Arc<UpstreamInner>,
}

impl Default for MockUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUpstream {
    pub fn new() -> Self {
        let (turn_tx, turn_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(UpstreamInner {
                texts: Mutex::new(Vec::new()),
                audio: Mutex::new(Vec::new()),
                closes: AtomicUsize::new(0),
                fail_sends: AtomicBool::new(false),
                replies: Mutex::new(HashMap::new()),
                turn_tx,
                turn_rx: tokio::sync::Mutex::new(turn_rx),
            }),
        }
    }

    /// Queue a turn for the next `receive` call.
    pub fn push_turn(&self, events: Vec<UpstreamEvent>) {
        self.push_raw_turn(events.into_iter().map(Ok).collect());
    }

    /// Queue a turn that may contain stream failures.
    pub fn push_raw_turn(&self, turn: Turn) {
        let _ = self.inner.turn_tx.send(turn);
    }

    /// Answer the text turn `prompt` with `events`.
    pub fn reply_to(&self, prompt: &str, events: Vec<UpstreamEvent>) {
        self.inner
            .replies
            .lock()
            .insert(prompt.to_string(), events.into_iter().map(Ok).collect());
    }

    /// Make every subsequent send fail.
    pub fn fail_sends(&self) {
        self.inner.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn texts(&self) -> Vec<String> {
        self.inner.texts.lock().clone()
    }

    pub fn audio(&self) -> Vec<(Bytes, u32)> {
        self.inner.audio.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    fn check_send(&self) -> RealtimeResult<()> {
        if self.inner.fail_sends.load(Ordering::SeqCst) {
            Err(RealtimeError::WebSocketError("mock send failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LiveSession for MockUpstream {
    async fn send_text_turn(&self, text: &str) -> RealtimeResult<()> {
        self.check_send()?;
        self.inner.texts.lock().push(text.to_string());
        if let Some(reply) = self.inner.replies.lock().remove(text) {
            self.push_raw_turn(reply);
        }
        Ok(())
    }

    async fn send_audio_chunk(&self, audio: Bytes, sample_rate: u32) -> RealtimeResult<()> {
        self.check_send()?;
        self.inner.audio.lock().push((audio, sample_rate));
        Ok(())
    }

    fn receive(&self) -> BoxStream<'_, RealtimeResult<UpstreamEvent>> {
        Box::pin(async_stream::stream! {
            let mut turns = self.inner.turn_rx.lock().await;
            if let Some(turn) = turns.recv().await {
                for event in turn {
                    yield event;
                }
            }
        })
    }

    async fn close(&self) -> RealtimeResult<()> {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.inner.closes.load(Ordering::SeqCst) == 0
    }
}

/// Connector handing out a shared [`MockUpstream`].
pub struct MockConnector {
    upstream: Option<MockUpstream>,
    opened: Mutex<Vec<LiveSessionConfig>>,
}

impl MockConnector {
    pub fn new(upstream: MockUpstream) -> Arc<Self> {
        Arc::new(Self {
            upstream: Some(upstream),
            opened: Mutex::new(Vec::new()),
        })
    }

    /// Connector whose every open is refused.
    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            upstream: None,
            opened: Mutex::new(Vec::new()),
        })
    }

    /// Configurations received by `open`, in order.
    pub fn opened(&self) -> Vec<LiveSessionConfig> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl LiveConnector for MockConnector {
    async fn open(&self, config: LiveSessionConfig) -> RealtimeResult<Box<dyn LiveSession>> {
        self.opened.lock().push(config);
        match &self.upstream {
            Some(upstream) => Ok(Box::new(upstream.clone())),
            None => Err(RealtimeError::ConnectionFailed(
                "mock upstream unavailable".to_string(),
            )),
        }
    }
}

/// A frame the relay wrote to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Text(String),
    Binary(Bytes),
}

/// Test side of an in-memory client connection.
pub struct MockClient {
    tx: Option<mpsc::UnboundedSender<Result<ClientMessage, RelayError>>>,
    frames: mpsc::UnboundedReceiver<ClientFrame>,
}

impl MockClient {
    pub fn send_text(&self, text: &str) {
        self.push(Ok(ClientMessage::Text(text.to_string())));
    }

    pub fn send_audio(&self, audio: &[u8]) {
        self.push(Ok(ClientMessage::Audio(Bytes::copy_from_slice(audio))));
    }

    pub fn send_ping(&self) {
        self.push(Ok(ClientMessage::Other("ping")));
    }

    /// Make the relay's next receive fail.
    pub fn break_link(&self) {
        self.push(Err(RelayError::ClientReceiveFailure(
            "connection reset".to_string(),
        )));
    }

    /// Close the client side; the relay sees end of stream.
    pub fn disconnect(&mut self) {
        self.tx = None;
    }

    /// Next frame the relay sent, or `None` after `wait` elapses.
    pub async fn next_frame(&mut self, wait: Duration) -> Option<ClientFrame> {
        tokio::time::timeout(wait, self.frames.recv())
            .await
            .ok()
            .flatten()
    }

    /// Every frame that arrives within `wait`.
    pub async fn drain_frames(&mut self, wait: Duration) -> Vec<ClientFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame(wait).await {
            frames.push(frame);
        }
        frames
    }

    fn push(&self, message: Result<ClientMessage, RelayError>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(message);
        }
    }
}

pub struct MockClientSource {
    rx: mpsc::UnboundedReceiver<Result<ClientMessage, RelayError>>,
}

#[async_trait]
impl ClientSource for MockClientSource {
    async fn recv(&mut self) -> Result<Option<ClientMessage>, RelayError> {
        match self.rx.recv().await {
            Some(message) => message.map(Some),
            None => Ok(None),
        }
    }
}

pub struct MockClientSink {
    tx: mpsc::UnboundedSender<ClientFrame>,
    fail: bool,
}

impl MockClientSink {
    fn deliver(&self, frame: ClientFrame) -> Result<(), RelayError> {
        if self.fail {
            return Err(RelayError::ClientSendFailure("mock sink closed".to_string()));
        }
        self.tx
            .send(frame)
            .map_err(|_| RelayError::ClientSendFailure("client gone".to_string()))
    }
}

#[async_trait]
impl ClientSink for MockClientSink {
    async fn send_text(&mut self, text: String) -> Result<(), RelayError> {
        self.deliver(ClientFrame::Text(text))
    }

    async fn send_binary(&mut self, data: Bytes) -> Result<(), RelayError> {
        self.deliver(ClientFrame::Binary(data))
    }
}

/// Wire an in-memory client to a relay source/sink pair.
pub fn client_pair() -> (MockClient, MockClientSource, MockClientSink) {
    build_pair(false)
}

/// Like [`client_pair`] but every send to the client fails.
pub fn client_pair_with_failing_sink() -> (MockClient, MockClientSource, MockClientSink) {
    build_pair(true)
}

fn build_pair(fail: bool) -> (MockClient, MockClientSource, MockClientSink) {
    let (msg_tx, msg_rx) = mpsc::unbounded_channel();
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    (
        MockClient {
            tx: Some(msg_tx),
            frames: frame_rx,
        },
        MockClientSource { rx: msg_rx },
        MockClientSink { tx: frame_tx, fail },
    )
}
