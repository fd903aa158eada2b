//! Client to upstream forwarding.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use super::channel::{ClientMessage, ClientSource};
use super::error::RelayError;
use super::session::RelaySession;
use super::shutdown::ShutdownSignal;
use crate::core::realtime::GEMINI_INPUT_SAMPLE_RATE;

/// Upper bound on a single client receive; also the shutdown polling period.
pub const CLIENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Client text that triggers the audio self-test.
pub const SELF_TEST_TRIGGER: &str = "SEND_TEST_AUDIO_PLEASE";

/// Prompt sent upstream in place of [`SELF_TEST_TRIGGER`].
pub const SELF_TEST_PROMPT: &str = "Hello Gemini, please say 'testing one two three'.";

/// The text turn to send upstream for a client text message.
pub fn prompt_for(text: &str) -> &str {
    if text == SELF_TEST_TRIGGER {
        SELF_TEST_PROMPT
    } else {
        text
    }
}

/// Reads client messages and turns them into upstream session calls.
pub struct InboundForwarder<S> {
    source: S,
    session: Arc<RelaySession>,
    shutdown: ShutdownSignal,
    input_sample_rate: u32,
    poll_interval: Duration,
}

impl<S: ClientSource> InboundForwarder<S> {
    pub fn new(source: S, session: Arc<RelaySession>, shutdown: ShutdownSignal) -> Self {
        Self {
            source,
            session,
            shutdown,
            input_sample_rate: GEMINI_INPUT_SAMPLE_RATE,
            poll_interval: CLIENT_POLL_INTERVAL,
        }
    }

    /// Sample rate declared for forwarded audio.
    pub fn with_input_sample_rate(mut self, sample_rate: u32) -> Self {
        self.input_sample_rate = sample_rate;
        self
    }

    /// Forward until the client goes away, a send fails, or shutdown is requested.
    ///
    /// Always leaves the shutdown signal triggered. The returned error is the
    /// failure that stopped forwarding, if any.
    pub async fn run(mut self) -> Result<(), RelayError> {
        let _stop_peer = self.shutdown.trigger_on_drop();

        let result = self.forward_loop().await;
        match &result {
            Ok(()) => info!("Inbound forwarder stopped"),
            Err(e) => error!("Inbound forwarder failed: {}", e),
        }

        self.shutdown.trigger();
        result
    }

    async fn forward_loop(&mut self) -> Result<(), RelayError> {
        while !self.shutdown.is_triggered() {
            let polled = tokio::select! {
                biased;

                _ = self.shutdown.triggered() => break,
                polled = Self::poll(&mut self.source, self.poll_interval) => polled,
            };

            let message = match polled {
                Ok(Some(message)) => message,
                Ok(None) => {
                    info!("Client disconnected");
                    return Ok(());
                }
                Err(e) if !e.is_fatal() => continue,
                Err(e) => return Err(e),
            };

            tokio::select! {
                biased;

                _ = self.shutdown.triggered() => {
                    debug!("Shutdown requested while forwarding client message");
                    return Ok(());
                }

                result = Self::forward(&self.session, self.input_sample_rate, message) => match result {
                    Err(e) if !e.is_fatal() => debug!("Skipping client message: {}", e),
                    other => other?,
                },
            }
        }

        Ok(())
    }

    /// Receive with a bounded wait.
    async fn poll(
        source: &mut S,
        poll_interval: Duration,
    ) -> Result<Option<ClientMessage>, RelayError> {
        match tokio::time::timeout(poll_interval, source.recv()).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::ClientReceiveTimeout),
        }
    }

    /// Takes its inputs by field so the future does not borrow the source,
    /// which is `Send` but not `Sync`.
    async fn forward(
        session: &RelaySession,
        input_sample_rate: u32,
        message: ClientMessage,
    ) -> Result<(), RelayError> {
        let upstream = session.upstream();

        match message {
            ClientMessage::Text(text) => {
                let prompt = prompt_for(&text);
                debug!(chars = prompt.len(), "Forwarding text turn");
                upstream
                    .send_text_turn(prompt)
                    .await
                    .map_err(RelayError::UpstreamSendFailure)
            }
            ClientMessage::Audio(audio) => {
                if audio.is_empty() {
                    return Ok(());
                }
                debug!(bytes = audio.len(), "Forwarding audio chunk");
                upstream
                    .send_audio_chunk(audio, input_sample_rate)
                    .await
                    .map_err(RelayError::UpstreamSendFailure)
            }
            ClientMessage::Other(kind) => Err(RelayError::UnexpectedPayloadShape(kind.to_string())),
        }
    }
}
