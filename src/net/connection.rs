//! Connection lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Count live connections
//! - Tell every connection to finish up when the server closes
//! - Let the server wait until the last connection is gone

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Global counter for connection IDs. Relaxed: only uniqueness matters.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks live connections for graceful close.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    /// Live connection count.
    active_tx: watch::Sender<u64>,
    /// Flips to `true` once connections should finish their current exchange.
    closing_tx: watch::Sender<bool>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        let (active_tx, _) = watch::channel(0);
        let (closing_tx, _) = watch::channel(false);
        Self {
            active_tx,
            closing_tx,
        }
    }

    /// Record a new live connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_tx.send_modify(|n| *n += 1);
        ConnectionGuard {
            active_tx: self.active_tx.clone(),
            closing_rx: self.closing_tx.subscribe(),
            id: ConnectionId::new(),
        }
    }

    /// Get current live connection count.
    pub fn active_count(&self) -> u64 {
        *self.active_tx.borrow()
    }

    /// Ask every tracked connection to close once its in-flight work is done.
    pub fn begin_close(&self) {
        self.closing_tx.send_replace(true);
    }

    /// Wait until no connections remain.
    pub async fn wait_until_idle(&self) {
        let mut active = self.active_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = active.wait_for(|n| *n == 0).await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements the live count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_tx: watch::Sender<u64>,
    closing_rx: watch::Receiver<bool>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Resolves once the server has started closing.
    pub async fn closing(&mut self) {
        let signalled = self.closing_rx.wait_for(|closing| *closing).await.is_ok();
        if !signalled {
            // Tracker gone: nothing will ever ask us to close.
            std::future::pending::<()>().await;
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_tx.send_modify(|n| *n = n.saturating_sub(1));
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
