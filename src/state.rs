use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::realtime::{GeminiConnector, LiveConnector};
use crate::core::relay::RelayCoordinator;

/// Application state shared by all handlers.
pub struct AppState {
    pub config: ServerConfig,
    /// Opens one upstream live session per client connection
    pub connector: Arc<dyn LiveConnector>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Self::with_connector(config, Arc::new(GeminiConnector))
    }

    /// Build state around a custom connector, used to point relays at a
    /// different upstream.
    pub fn with_connector(config: ServerConfig, connector: Arc<dyn LiveConnector>) -> Arc<Self> {
        Arc::new(Self { config, connector })
    }

    /// Coordinator for a fresh client connection.
    pub fn relay_coordinator(&self) -> RelayCoordinator {
        RelayCoordinator::new(self.connector.clone(), self.config.live_session_config())
            .with_input_sample_rate(self.config.input_sample_rate)
    }
}
