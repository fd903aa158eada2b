pub mod realtime;
pub mod relay;

// Re-export commonly used types for convenience
pub use realtime::{
    GeminiConnector, LiveConnector, LiveSession, LiveSessionConfig, RealtimeError,
    RealtimeResult, UpstreamEvent,
};

pub use relay::{RelayCoordinator, RelayError, RelayState, RelaySummary};
