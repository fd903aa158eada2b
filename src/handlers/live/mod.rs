//! Live relay WebSocket handler
//!
//! Each client connection gets its own upstream Gemini Live session. Text
//! frames become user turns, binary frames are raw 16-bit PCM forwarded as
//! realtime audio. Everything the model produces is written back on the
//! same socket.

mod handler;
mod socket;

pub use handler::{MAX_WS_FRAME_SIZE, MAX_WS_MESSAGE_SIZE, live_handler};
pub use socket::{WsClientSink, WsClientSource};
