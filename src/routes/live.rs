use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::live::live_handler;
use crate::state::AppState;

/// Path clients connect to for a live relay
pub const LIVE_PATH: &str = "/listen";

/// Create the live relay router
///
/// Returns a router that handles WebSocket connections at [`LIVE_PATH`].
pub fn create_live_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(LIVE_PATH, get(live_handler))
        .layer(TraceLayer::new_for_http())
}
