//! Upstream to client forwarding.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use super::channel::ClientSink;
use super::error::RelayError;
use super::frames::OutboundFrame;
use super::session::RelaySession;
use super::shutdown::ShutdownSignal;
use crate::core::realtime::UpstreamEvent;

/// Pause after a turn that produced no events at all.
pub const EMPTY_PASS_BACKOFF: Duration = Duration::from_millis(100);

/// Reads upstream events turn by turn and writes client frames.
pub struct OutboundForwarder<K> {
    sink: K,
    session: Arc<RelaySession>,
    shutdown: ShutdownSignal,
}

impl<K: ClientSink> OutboundForwarder<K> {
    pub fn new(sink: K, session: Arc<RelaySession>, shutdown: ShutdownSignal) -> Self {
        Self {
            sink,
            session,
            shutdown,
        }
    }

    /// Relay upstream turns until shutdown or a fatal failure.
    ///
    /// Always leaves the shutdown signal triggered.
    pub async fn run(mut self) -> Result<(), RelayError> {
        let _stop_peer = self.shutdown.trigger_on_drop();

        let result = self.relay_loop().await;
        if let Err(e) = &result
            && let Some(report) = e.client_report()
        {
            self.report_upstream_error(report).await;
        }
        match &result {
            Ok(()) => info!("Outbound forwarder stopped"),
            Err(e) => error!("Outbound forwarder failed: {}", e),
        }

        self.shutdown.trigger();
        result
    }

    async fn relay_loop(&mut self) -> Result<(), RelayError> {
        while !self.shutdown.is_triggered() {
            let relayed = self.relay_turn().await?;

            if relayed == 0 && !self.shutdown.is_triggered() {
                tokio::select! {
                    _ = self.shutdown.triggered() => {}
                    _ = tokio::time::sleep(EMPTY_PASS_BACKOFF) => {}
                }
            }
        }

        Ok(())
    }

    /// One pass over the upstream event stream. Returns the number of events seen.
    async fn relay_turn(&mut self) -> Result<usize, RelayError> {
        let session = self.session.clone();
        let mut events = session.upstream().receive();
        let mut relayed = 0;

        loop {
            let next = tokio::select! {
                biased;

                _ = self.shutdown.triggered() => return Ok(relayed),
                next = events.next() => next,
            };

            let Some(item) = next else {
                break;
            };
            relayed += 1;

            match item {
                Ok(event) => self.dispatch(event).await?,
                Err(e) => return Err(RelayError::UpstreamStreamFailure(e)),
            }
        }

        Ok(relayed)
    }

    async fn dispatch(&mut self, event: UpstreamEvent) -> Result<(), RelayError> {
        match event {
            UpstreamEvent::ResumptionUpdate { handle, resumable } => {
                if resumable && !handle.is_empty() {
                    self.session.update_resumption_handle(handle);
                } else {
                    debug!(resumable, "Ignoring session resumption update");
                }
                Ok(())
            }
            UpstreamEvent::AudioData(audio) => {
                debug!(bytes = audio.len(), "Forwarding audio to client");
                OutboundFrame::RawAudio(audio).send_to(&mut self.sink).await
            }
            UpstreamEvent::Interrupted => {
                info!("Upstream interrupted playback");
                OutboundFrame::interrupt().send_to(&mut self.sink).await
            }
            UpstreamEvent::TextFragment { text, source } => {
                debug!(source = %source, chars = text.len(), "Forwarding text to client");
                OutboundFrame::text(source, text)
                    .send_to(&mut self.sink)
                    .await
            }
            UpstreamEvent::Error(message) => {
                warn!("Upstream reported error: {}", message);
                Err(RelayError::UpstreamEventError(message))
            }
            UpstreamEvent::TurnComplete => {
                debug!("Upstream turn complete");
                Ok(())
            }
        }
    }

    /// Best-effort error frame; a broken client link is only logged.
    async fn report_upstream_error(&mut self, message: String) {
        if let Err(e) = OutboundFrame::error(message).send_to(&mut self.sink).await {
            warn!("Could not report upstream error to client: {}", e);
        }
    }
}
