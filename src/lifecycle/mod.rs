//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Install signals → Bind listener → Spawn run loop → Accepting = true
//!
//! Signals (signals.rs):
//!     SIGTERM (+ SIGINT when enabled) → TerminationSignal event
//!
//! Shutdown (shutdown.rs):
//!     Signal → Accepting = false → drain window → close listener
//!         → in-flight requests finish (bounded) → Terminated
//! ```
//!
//! # Design Decisions
//! - The accepting flag is cleared before the drain timer starts
//! - The socket stays open for the whole drain window so health checks can
//!   route traffic away first
//! - Shutdown is one-shot: repeated signals are ignored

pub mod accepting;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use accepting::AcceptingState;
pub use shutdown::{ServerControl, ShutdownSequencer, ShutdownState, Termination};
pub use signals::{SignalWatcher, TerminationSignal};
pub use startup::{BoundRuntime, Runtime, RuntimeError};
