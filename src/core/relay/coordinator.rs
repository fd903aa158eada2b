//! Lifecycle of one client relay.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::AbortOnDropHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::channel::{ClientSink, ClientSource};
use super::error::RelayError;
use super::frames::OutboundFrame;
use super::inbound::InboundForwarder;
use super::outbound::OutboundForwarder;
use super::session::RelaySession;
use super::shutdown::ShutdownSignal;
use crate::core::realtime::{GEMINI_INPUT_SAMPLE_RATE, LiveConnector, LiveSessionConfig};

/// How long forwarders get to notice shutdown before they are aborted.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Relay lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Opening the upstream session
    Connecting,
    /// Both forwarders running
    Active,
    /// Stopping forwarders and releasing the upstream session
    Closing,
    /// Everything released
    Closed,
}

impl RelayState {
    pub fn can_transition_to(self, next: RelayState) -> bool {
        matches!(
            (self, next),
            (RelayState::Connecting, RelayState::Active)
                | (RelayState::Connecting, RelayState::Closed)
                | (RelayState::Active, RelayState::Closing)
                | (RelayState::Closing, RelayState::Closed)
        )
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Connecting => write!(f, "connecting"),
            RelayState::Active => write!(f, "active"),
            RelayState::Closing => write!(f, "closing"),
            RelayState::Closed => write!(f, "closed"),
        }
    }
}

/// How a forwarder task ended.
#[derive(Debug)]
pub enum ForwarderExit {
    /// Stopped on shutdown or client disconnect
    Completed,
    /// Stopped on a fatal relay failure
    Failed(RelayError),
    /// Aborted after the grace period
    Cancelled,
    Panicked,
}

impl ForwarderExit {
    pub fn is_clean(&self) -> bool {
        matches!(self, ForwarderExit::Completed)
    }
}

/// Outcome of a finished relay.
#[derive(Debug)]
pub struct RelaySummary {
    pub relay_id: Uuid,
    /// Last resumable handle the upstream announced
    pub resumption_handle: Option<String>,
    pub inbound: ForwarderExit,
    pub outbound: ForwarderExit,
}

/// Owns the upstream session of one client connection and both forwarders.
pub struct RelayCoordinator {
    relay_id: Uuid,
    connector: Arc<dyn LiveConnector>,
    config: LiveSessionConfig,
    input_sample_rate: u32,
    grace_period: Duration,
    state: RelayState,
}

impl RelayCoordinator {
    pub fn new(connector: Arc<dyn LiveConnector>, config: LiveSessionConfig) -> Self {
        Self {
            relay_id: Uuid::new_v4(),
            connector,
            config,
            input_sample_rate: GEMINI_INPUT_SAMPLE_RATE,
            grace_period: DEFAULT_GRACE_PERIOD,
            state: RelayState::Connecting,
        }
    }

    pub fn with_input_sample_rate(mut self, sample_rate: u32) -> Self {
        self.input_sample_rate = sample_rate;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn relay_id(&self) -> Uuid {
        self.relay_id
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Run the relay to completion.
    ///
    /// Opens the upstream session, forwards in both directions until either
    /// side stops, then closes the session exactly once. Dropping the returned
    /// future aborts both forwarders, which releases the session.
    pub async fn run<S, K>(mut self, source: S, mut sink: K) -> Result<RelaySummary, RelayError>
    where
        S: ClientSource + 'static,
        K: ClientSink + 'static,
    {
        info!(relay_id = %self.relay_id, model = %self.config.model, "Opening upstream session");

        let upstream = match self.connector.open(self.config.clone()).await {
            Ok(upstream) => upstream,
            Err(e) => {
                error!(relay_id = %self.relay_id, "Failed to open upstream session: {}", e);
                let failure = RelayError::UpstreamOpenFailed(e);
                if let Some(report) = failure.client_report()
                    && let Err(send_err) = OutboundFrame::error(report).send_to(&mut sink).await
                {
                    warn!(relay_id = %self.relay_id, "Failed to report open failure: {}", send_err);
                }
                self.transition(RelayState::Closed);
                return Err(failure);
            }
        };

        let session = Arc::new(RelaySession::new(Arc::from(upstream)));
        self.transition(RelayState::Active);

        let shutdown = ShutdownSignal::new();

        let inbound = AbortOnDropHandle::new(tokio::spawn(
            InboundForwarder::new(source, session.clone(), shutdown.clone())
                .with_input_sample_rate(self.input_sample_rate)
                .run(),
        ));
        let outbound = AbortOnDropHandle::new(tokio::spawn(
            OutboundForwarder::new(sink, session.clone(), shutdown.clone()).run(),
        ));

        // Each forwarder triggers the signal on every exit path
        shutdown.triggered().await;

        self.transition(RelayState::Closing);
        shutdown.trigger();

        let (inbound, outbound) = tokio::join!(
            self.join_forwarder("inbound", inbound),
            self.join_forwarder("outbound", outbound),
        );

        match session.close().await {
            Ok(true) => info!(relay_id = %self.relay_id, "Upstream session closed"),
            Ok(false) => {}
            Err(e) => warn!(relay_id = %self.relay_id, "Error closing upstream session: {}", e),
        }

        let resumption_handle = session.resumption_handle();
        if let Some(handle) = &resumption_handle {
            info!(relay_id = %self.relay_id, handle = %handle, "Session ended with resumable handle");
        }

        self.transition(RelayState::Closed);

        Ok(RelaySummary {
            relay_id: self.relay_id,
            resumption_handle,
            inbound,
            outbound,
        })
    }

    async fn join_forwarder(
        &self,
        name: &'static str,
        mut handle: AbortOnDropHandle<Result<(), RelayError>>,
    ) -> ForwarderExit {
        let joined = match tokio::time::timeout(self.grace_period, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    relay_id = %self.relay_id,
                    forwarder = name,
                    "Forwarder did not stop within grace period, aborting"
                );
                handle.abort();
                handle.await
            }
        };

        match joined {
            Ok(Ok(())) => ForwarderExit::Completed,
            Ok(Err(e)) => ForwarderExit::Failed(e),
            Err(e) if e.is_panic() => {
                error!(relay_id = %self.relay_id, forwarder = name, "Forwarder panicked");
                ForwarderExit::Panicked
            }
            Err(_) => ForwarderExit::Cancelled,
        }
    }

    fn transition(&mut self, next: RelayState) {
        if !self.state.can_transition_to(next) {
            warn!(
                relay_id = %self.relay_id,
                from = %self.state,
                to = %next,
                "Unexpected relay state transition"
            );
        }
        info!(relay_id = %self.relay_id, from = %self.state, to = %next, "Relay state changed");
        self.state = next;
    }
}
