//! The upstream session as owned by one relay.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::info;

use crate::core::realtime::{LiveSession, RealtimeResult};

/// An open upstream session plus the state the relay keeps about it.
///
/// `active` goes from true to false exactly once, in [`RelaySession::close`].
pub struct RelaySession {
    upstream: Arc<dyn LiveSession>,
    resumption_handle: RwLock<Option<String>>,
    active: AtomicBool,
}

impl RelaySession {
    pub fn new(upstream: Arc<dyn LiveSession>) -> Self {
        Self {
            upstream,
            resumption_handle: RwLock::new(None),
            active: AtomicBool::new(true),
        }
    }

    pub fn upstream(&self) -> &dyn LiveSession {
        self.upstream.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Latest resumable handle announced by the upstream session.
    pub fn resumption_handle(&self) -> Option<String> {
        self.resumption_handle.read().clone()
    }

    /// Only the outbound forwarder records handles.
    pub(crate) fn update_resumption_handle(&self, handle: String) {
        info!(handle = %handle, "Stored session resumption handle");
        *self.resumption_handle.write() = Some(handle);
    }

    /// Close the upstream session.
    ///
    /// Returns `Ok(false)` without touching the upstream if already closed.
    pub async fn close(&self) -> RealtimeResult<bool> {
        if !self.active.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        self.upstream.close().await?;
        Ok(true)
    }
}
