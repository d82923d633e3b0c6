//! Startup orchestration and the lifecycle controller.
//!
//! # Responsibilities
//! - Install signal handlers, bind the listener, start the run loop
//! - Flip the accepting flag once the listener is live
//! - Block until the shutdown sequence terminates and report how it ended
//!
//! # Design Decisions
//! - Fail fast: signal or bind errors are returned before anything is served
//! - The accepting flag is never set if binding fails
//! - Only the caller of [`Runtime::run`] decides to exit the process

use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::config::{RuntimeConfig, TimeoutPolicy};
use crate::http::handler::Handler;
use crate::http::server::{HttpServer, ServeError};
use crate::lifecycle::accepting::AcceptingState;
use crate::lifecycle::shutdown::{ServerControl, ShutdownSequencer, Termination};
use crate::lifecycle::signals::{SignalWatcher, TerminationSignal};
use crate::net::listener::{Listener, ListenerError};

/// Fatal lifecycle errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] io::Error),

    #[error(transparent)]
    Bind(#[from] ListenerError),

    #[error("server failed: {0}")]
    Serve(#[from] ServeError),
}

/// A function runtime, configured but not yet bound.
pub struct Runtime<H> {
    config: RuntimeConfig,
    handler: H,
    accepting: AcceptingState,
}

impl<H: Handler> Runtime<H> {
    pub fn new(config: RuntimeConfig, handler: H) -> Self {
        Self {
            config,
            handler,
            accepting: AcceptingState::new(),
        }
    }

    /// Handle to the accepting flag, for health probes.
    pub fn accepting(&self) -> AcceptingState {
        self.accepting.clone()
    }

    /// Install OS signal handlers, bind, and serve until shutdown completes.
    pub async fn run(self) -> Result<(), RuntimeError> {
        let watcher = SignalWatcher::install(self.config.signals).map_err(RuntimeError::Signals)?;
        let bound = self.bind().await?;
        bound.serve(watcher.spawn()).await
    }

    /// Bind the listener without serving yet.
    pub async fn bind(self) -> Result<BoundRuntime, RuntimeError> {
        tracing::info!(
            config = %serde_json::to_string(&self.config).unwrap_or_default(),
            "Runtime config"
        );

        let listener = match Listener::bind(&self.config.listener).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "Failed to bind listener");
                return Err(e.into());
            }
        };

        Ok(BoundRuntime {
            server: HttpServer::new(self.handler, self.config.timeouts),
            listener,
            timeouts: self.config.timeouts,
            accepting: self.accepting,
        })
    }
}

/// A runtime whose listener is bound.
pub struct BoundRuntime {
    server: HttpServer,
    listener: Listener,
    timeouts: TimeoutPolicy,
    accepting: AcceptingState,
}

impl BoundRuntime {
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn accepting(&self) -> AcceptingState {
        self.accepting.clone()
    }

    /// Start the run loop and the shutdown sequencer, then block until the
    /// sequence terminates.
    ///
    /// `signals` delivers termination requests; in production it is fed by
    /// [`SignalWatcher::spawn`].
    pub async fn serve(
        self,
        signals: mpsc::Receiver<TerminationSignal>,
    ) -> Result<(), RuntimeError> {
        let (close_tx, close_rx) = oneshot::channel();
        let address = self.listener.local_addr();
        let run_loop = tokio::spawn(self.server.run(self.listener, close_rx));

        self.accepting.set_accepting(true);
        tracing::info!(address = %address, "Accepting connections");

        let sequencer = ShutdownSequencer::new(self.timeouts, self.accepting);
        match sequencer
            .run(signals, ServerControl::new(close_tx, run_loop))
            .await
        {
            Termination::Drained => {
                tracing::info!("Shutdown complete");
                Ok(())
            }
            Termination::CloseTimedOut => {
                tracing::warn!("Shutdown complete with requests still in flight");
                Ok(())
            }
            Termination::ServerFailed(e) => Err(e.into()),
        }
    }
}
