use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::StreamExt;
use tracing::{error, info, warn};

use super::socket::{WsClientSink, WsClientSource};
use crate::state::AppState;

/// Maximum WebSocket frame size (10MB)
pub const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10MB)
pub const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Upgrade the request and relay the socket to a new live session.
pub async fn live_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Live relay WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_live_socket(socket, state))
}

async fn handle_live_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, receiver) = socket.split();

    let coordinator = state.relay_coordinator();
    let relay_id = coordinator.relay_id();
    info!(%relay_id, "Live relay WebSocket connection established");

    match coordinator
        .run(WsClientSource::new(receiver), WsClientSink::new(sender))
        .await
    {
        Ok(summary) => {
            if summary.inbound.is_clean() && summary.outbound.is_clean() {
                info!(%relay_id, "Live relay finished");
            } else {
                warn!(
                    %relay_id,
                    inbound = ?summary.inbound,
                    outbound = ?summary.outbound,
                    "Live relay finished with errors"
                );
            }
        }
        Err(e) => error!(%relay_id, "Live relay failed: {}", e),
    }
}
