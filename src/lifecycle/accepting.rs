//! Accepting-state flag.
//!
//! # Lifecycle
//! ```text
//! false (unset) → true (listener bound) → false (shutdown begins) → exit
//! ```
//!
//! # Design Decisions
//! - One atomic bool behind an `Arc`; cloned handles share the same cell
//! - Owned by the lifecycle controller, never a global
//! - Every write also updates the `function_accepting` gauge

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Shared handle to the process's "accepting new work" flag.
///
/// Probes racing an update may observe either value.
#[derive(Debug, Clone, Default)]
pub struct AcceptingState {
    inner: Arc<AtomicBool>,
}

impl AcceptingState {
    /// Create a flag in the unset (`false`) state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.inner.store(accepting, Ordering::SeqCst);
        metrics::record_accepting(accepting);
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}
