//! OS signal handling.
//!
//! # Responsibilities
//! - Subscribe to SIGTERM (always) and SIGINT (when configured)
//! - Forward every delivery as a [`TerminationSignal`] event
//!
//! # Design Decisions
//! - Subscriptions are installed up front so a failure surfaces at startup
//! - Repeated signals are forwarded too; the shutdown state machine decides
//!   they are ignored

use std::fmt;
use tokio::sync::mpsc;

use crate::config::SignalConfig;

/// A termination request delivered by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGTERM.
    Terminate,
    /// SIGINT / Ctrl+C.
    Interrupt,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
        }
    }
}

/// Installed signal subscriptions.
pub struct SignalWatcher {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    interrupt: Option<tokio::signal::unix::Signal>,
    #[cfg(not(unix))]
    handle_interrupt: bool,
}

impl SignalWatcher {
    /// Register the signal handlers.
    #[cfg(unix)]
    pub fn install(config: SignalConfig) -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let terminate = signal(SignalKind::terminate())?;
        let interrupt = if config.handle_interrupt {
            Some(signal(SignalKind::interrupt())?)
        } else {
            None
        };

        tracing::debug!(
            handle_interrupt = config.handle_interrupt,
            "Signal handlers installed"
        );
        Ok(Self {
            terminate,
            interrupt,
        })
    }

    /// Register the signal handlers.
    #[cfg(not(unix))]
    pub fn install(config: SignalConfig) -> std::io::Result<Self> {
        Ok(Self {
            handle_interrupt: config.handle_interrupt,
        })
    }

    /// Wait for the next termination signal.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> Option<TerminationSignal> {
        let Self {
            terminate,
            interrupt,
        } = self;

        let interrupt = async {
            match interrupt.as_mut() {
                Some(sig) => sig.recv().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            received = terminate.recv() => received.map(|_| TerminationSignal::Terminate),
            received = interrupt => received.map(|_| TerminationSignal::Interrupt),
        }
    }

    /// Wait for the next termination signal.
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Option<TerminationSignal> {
        if !self.handle_interrupt {
            return std::future::pending().await;
        }
        tokio::signal::ctrl_c()
            .await
            .ok()
            .map(|_| TerminationSignal::Interrupt)
    }

    /// Forward signals into a channel from a background task.
    ///
    /// The task ends when the receiver is dropped.
    pub fn spawn(mut self) -> mpsc::Receiver<TerminationSignal> {
        let (tx, rx) = mpsc::channel(4);

        tokio::spawn(async move {
            while let Some(signal) = self.recv().await {
                tracing::debug!(signal = %signal, "Signal delivered");
                if tx.send(signal).await.is_err() {
                    break;
                }
            }
        });

        rx
    }
}
