//! Mock upstreams and clients for live relay integration tests
//!
//! - `relay_mocks` - scripted upstream session, connector and in-memory client
//! - `gemini_ws_mock` - WebSocket server speaking the Gemini Live protocol

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod gemini_ws_mock;
pub mod relay_mocks;
