//! Duplex relay between a client connection and an upstream live session.
//!
//! A relay runs two forwarders as separate tasks:
//!
//! - [`InboundForwarder`] reads client text and audio and calls the upstream
//!   session
//! - [`OutboundForwarder`] reads upstream events turn by turn and writes
//!   client frames
//!
//! Both share one [`ShutdownSignal`]. Whichever side stops first triggers it,
//! and the [`RelayCoordinator`] then joins both and closes the upstream
//! session exactly once.
//!
//! # Client protocol
//!
//! | Upstream event | Client frame |
//! |---|---|
//! | audio | binary, verbatim |
//! | text | `[TEXT_FROM_GEMINI]: <text>` |
//! | transcription | `[TRANSCRIPT_FROM_GEMINI]: <text>` |
//! | error | `[ERROR_FROM_GEMINI]: <message>` |
//! | interruption | `{"action": "interrupt_playback"}` |

mod channel;
mod coordinator;
mod error;
mod frames;
mod inbound;
mod outbound;
mod session;
mod shutdown;

#[cfg(test)]
mod test_support;

pub use channel::{ClientMessage, ClientSink, ClientSource};
pub use coordinator::{
    DEFAULT_GRACE_PERIOD, ForwarderExit, RelayCoordinator, RelayState, RelaySummary,
};
pub use error::RelayError;
pub use frames::{ERROR_TAG, INTERRUPT_PLAYBACK, OutboundFrame, TEXT_TAG, TRANSCRIPT_TAG};
pub use inbound::{
    CLIENT_POLL_INTERVAL, InboundForwarder, SELF_TEST_PROMPT, SELF_TEST_TRIGGER, prompt_for,
};
pub use outbound::{EMPTY_PASS_BACKOFF, OutboundForwarder};
pub use session::RelaySession;
pub use shutdown::ShutdownSignal;
