//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `live` - Client WebSocket relayed to a Gemini Live session

pub mod api;
pub mod live;

pub use live::live_handler;
