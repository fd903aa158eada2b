use thiserror::Error;

use crate::core::realtime::RealtimeError;

/// Failures observed while relaying between the client and the upstream session.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No client message arrived within one poll interval
    #[error("Client receive timed out")]
    ClientReceiveTimeout,

    /// The client socket could not be read
    #[error("Client receive failed: {0}")]
    ClientReceiveFailure(String),

    /// A frame could not be written to the client socket
    #[error("Client send failed: {0}")]
    ClientSendFailure(String),

    /// Text or audio could not be handed to the upstream session
    #[error("Upstream send failed: {0}")]
    UpstreamSendFailure(#[source] RealtimeError),

    /// The upstream session reported an error
    #[error("Upstream reported an error: {0}")]
    UpstreamEventError(String),

    /// The upstream event stream broke
    #[error("Upstream event stream failed: {0}")]
    UpstreamStreamFailure(#[source] RealtimeError),

    /// The client sent a payload kind the relay does not handle
    #[error("Unexpected payload shape: {0}")]
    UnexpectedPayloadShape(String),

    /// The upstream session could not be opened
    #[error("Failed to open upstream session: {0}")]
    UpstreamOpenFailed(#[source] RealtimeError),
}

impl RelayError {
    /// Whether this failure ends the relay.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RelayError::ClientReceiveTimeout | RelayError::UnexpectedPayloadShape(_)
        )
    }

    /// Text the client is told before teardown, if this failure is reported.
    ///
    /// Upstream send failures stay silent since the inbound side has no sink.
    pub fn client_report(&self) -> Option<String> {
        match self {
            RelayError::UpstreamEventError(message) => Some(message.clone()),
            RelayError::UpstreamStreamFailure(_) => Some(self.to_string()),
            RelayError::UpstreamOpenFailed(source) => Some(source.to_string()),
            _ => None,
        }
    }
}
