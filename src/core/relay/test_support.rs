//! In-memory doubles for relay unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::channel::{ClientMessage, ClientSink, ClientSource};
use super::error::RelayError;
use crate::core::realtime::{LiveSession, RealtimeError, RealtimeResult, UpstreamEvent};

/// Upstream session that records calls and replays scripted turns.
#[derive(Default)]
pub struct ScriptedSession {
    pub texts: Mutex<Vec<String>>,
    pub audio: Mutex<Vec<(Bytes, u32)>>,
    pub closes: AtomicUsize,
    pub turns: Mutex<VecDeque<Vec<RealtimeResult<UpstreamEvent>>>>,
    pub receive_calls: AtomicUsize,
    pub fail_sends: bool,
}

impl ScriptedSession {
    pub fn with_turns(turns: Vec<Vec<RealtimeResult<UpstreamEvent>>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            ..Default::default()
        }
    }

    pub fn failing_sends() -> Self {
        Self {
            fail_sends: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl LiveSession for ScriptedSession {
    async fn send_text_turn(&self, text: &str) -> RealtimeResult<()> {
        if self.fail_sends {
            return Err(RealtimeError::NotConnected);
        }
        self.texts.lock().push(text.to_string());
        Ok(())
    }

    async fn send_audio_chunk(&self, audio: Bytes, sample_rate: u32) -> RealtimeResult<()> {
        if self.fail_sends {
            return Err(RealtimeError::NotConnected);
        }
        self.audio.lock().push((audio, sample_rate));
        Ok(())
    }

    fn receive(&self) -> BoxStream<'_, RealtimeResult<UpstreamEvent>> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        let turn = self.turns.lock().pop_front().unwrap_or_default();
        Box::pin(stream::iter(turn))
    }

    async fn close(&self) -> RealtimeResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }
}

/// Client source fed through a channel; dropping the sender disconnects.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Result<ClientMessage, RelayError>>,
}

pub fn channel_source() -> (
    mpsc::UnboundedSender<Result<ClientMessage, RelayError>>,
    ChannelSource,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ChannelSource { rx })
}

#[async_trait]
impl ClientSource for ChannelSource {
    async fn recv(&mut self) -> Result<Option<ClientMessage>, RelayError> {
        match self.rx.recv().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

/// A frame as seen by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum SentFrame {
    Text(String),
    Binary(Bytes),
}

/// Client sink recording everything sent to it.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub frames: Arc<Mutex<Vec<SentFrame>>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn frames(&self) -> Vec<SentFrame> {
        self.frames.lock().clone()
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn send_text(&mut self, text: String) -> Result<(), RelayError> {
        if self.fail {
            return Err(RelayError::ClientSendFailure("client gone".to_string()));
        }
        self.frames.lock().push(SentFrame::Text(text));
        Ok(())
    }

    async fn send_binary(&mut self, data: Bytes) -> Result<(), RelayError> {
        if self.fail {
            return Err(RelayError::ClientSendFailure("client gone".to_string()));
        }
        self.frames.lock().push(SentFrame::Binary(data));
        Ok(())
    }
}
