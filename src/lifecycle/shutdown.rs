//! Shutdown sequencing.
//!
//! # States
//! ```text
//! Running ──signal──▶ Draining ──drain window──▶ Closing ──closed / deadline──▶ Terminated
//!    │                    │                          │
//!    └────────────── run loop exited ────────────────┴──────▶ Terminated (failed)
//! ```
//!
//! # Transitions
//! - Running → Draining: clear the accepting flag, then start the drain timer
//!   (`healthcheck_interval`)
//! - Draining → Closing: ask the server to close; in-flight requests finish
//! - Closing → Terminated: the server finished closing, or the close bound
//!   (`write_timeout`) or grace window (`shutdown_grace`) ran out
//!
//! A second signal never restarts the sequence.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Instant};

use crate::config::TimeoutPolicy;
use crate::http::server::ServeError;
use crate::lifecycle::accepting::AcceptingState;
use crate::lifecycle::signals::TerminationSignal;

/// Timeline of one shutdown, created when the first signal arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownSequence {
    pub signal: TerminationSignal,
    pub signal_received_at: Instant,
    /// When the socket may be closed.
    pub drain_deadline: Instant,
    /// Latest exit time once closing; set on entering `Closing`.
    pub shutdown_deadline: Option<Instant>,
    /// Bound on the graceful close itself; `None` when unbounded.
    pub close_deadline: Option<Instant>,
}

/// Shutdown state machine. Transitions only through the `on_*` methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining(ShutdownSequence),
    Closing(ShutdownSequence),
    Terminated,
}

impl ShutdownState {
    /// Running → Draining. Returns `None` when a shutdown is already under way.
    pub fn on_signal(
        &mut self,
        signal: TerminationSignal,
        now: Instant,
        drain: Duration,
    ) -> Option<ShutdownSequence> {
        match self {
            ShutdownState::Running => {
                let sequence = ShutdownSequence {
                    signal,
                    signal_received_at: now,
                    drain_deadline: deadline_after(now, drain),
                    shutdown_deadline: None,
                    close_deadline: None,
                };
                *self = ShutdownState::Draining(sequence);
                Some(sequence)
            }
            _ => None,
        }
    }

    /// Draining → Closing.
    pub fn on_drain_elapsed(
        &mut self,
        now: Instant,
        grace: Duration,
        close_bound: Option<Duration>,
    ) -> Option<ShutdownSequence> {
        match *self {
            ShutdownState::Draining(sequence) => {
                let sequence = ShutdownSequence {
                    shutdown_deadline: Some(deadline_after(now, grace)),
                    close_deadline: close_bound.map(|bound| deadline_after(now, bound)),
                    ..sequence
                };
                *self = ShutdownState::Closing(sequence);
                Some(sequence)
            }
            _ => None,
        }
    }

    /// Closing → Terminated.
    pub fn on_closed(&mut self) -> bool {
        match self {
            ShutdownState::Closing(_) => {
                *self = ShutdownState::Terminated;
                true
            }
            _ => false,
        }
    }

    /// Any live state → Terminated, when the run loop exits by itself.
    pub fn on_server_exit(&mut self) -> bool {
        match self {
            ShutdownState::Terminated => false,
            _ => {
                *self = ShutdownState::Terminated;
                true
            }
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, ShutdownState::Terminated)
    }
}

/// How the sequence ended.
#[derive(Debug)]
pub enum Termination {
    /// The server closed after the drain window.
    Drained,
    /// The close outlived `write_timeout` or the grace window.
    CloseTimedOut,
    /// The run loop exited with an error.
    ServerFailed(ServeError),
}

/// The sequencer's grip on a running server: a close trigger and the run
/// loop's task.
#[derive(Debug)]
pub struct ServerControl {
    close: oneshot::Sender<()>,
    exit: JoinHandle<Result<(), ServeError>>,
}

impl ServerControl {
    pub fn new(close: oneshot::Sender<()>, exit: JoinHandle<Result<(), ServeError>>) -> Self {
        Self { close, exit }
    }
}

/// Drives [`ShutdownState`] from signals, timers and the server's exit.
pub struct ShutdownSequencer {
    timeouts: TimeoutPolicy,
    accepting: AcceptingState,
    state: ShutdownState,
}

impl ShutdownSequencer {
    pub fn new(timeouts: TimeoutPolicy, accepting: AcceptingState) -> Self {
        Self {
            timeouts,
            accepting,
            state: ShutdownState::Running,
        }
    }

    /// Run until `Terminated`.
    pub async fn run(
        mut self,
        mut signals: mpsc::Receiver<TerminationSignal>,
        server: ServerControl,
    ) -> Termination {
        let ServerControl { close, mut exit } = server;
        let mut close = Some(close);

        loop {
            match self.state {
                ShutdownState::Running => tokio::select! {
                    joined = &mut exit => return self.server_exited(joined),
                    signal = next_signal(&mut signals) => self.begin_drain(signal),
                },
                ShutdownState::Draining(sequence) => tokio::select! {
                    _ = sleep_until(sequence.drain_deadline) => {
                        if let Some(sequence) = self.state.on_drain_elapsed(
                            Instant::now(),
                            self.timeouts.shutdown_grace,
                            self.timeouts.write_limit(),
                        ) {
                            if let Some(close) = close.take() {
                                let _ = close.send(());
                            }
                            tracing::info!(
                                drained_for = ?sequence.signal_received_at.elapsed(),
                                grace = ?self.timeouts.shutdown_grace,
                                "Drain window elapsed, closing listener"
                            );
                        }
                    }
                    signal = next_signal(&mut signals) => self.ignore_signal(signal),
                    joined = &mut exit => return self.server_exited(joined),
                },
                ShutdownState::Closing(sequence) => {
                    let deadline = match (sequence.shutdown_deadline, sequence.close_deadline) {
                        (Some(grace), Some(close)) => grace.min(close),
                        (Some(deadline), None) | (None, Some(deadline)) => deadline,
                        (None, None) => Instant::now(),
                    };
                    tokio::select! {
                        joined = &mut exit => {
                            return match flatten(joined) {
                                Ok(()) => {
                                    self.state.on_closed();
                                    tracing::info!(
                                        total = ?sequence.signal_received_at.elapsed(),
                                        "Listener closed, in-flight requests finished"
                                    );
                                    Termination::Drained
                                }
                                Err(e) => self.fail(e),
                            };
                        }
                        _ = sleep_until(deadline) => {
                            self.state.on_closed();
                            tracing::warn!(
                                total = ?sequence.signal_received_at.elapsed(),
                                "Graceful close did not finish in time, exiting"
                            );
                            return Termination::CloseTimedOut;
                        }
                        signal = next_signal(&mut signals) => self.ignore_signal(signal),
                    }
                }
                ShutdownState::Terminated => return Termination::Drained,
            }
        }
    }

    fn begin_drain(&mut self, signal: TerminationSignal) {
        let drain = self.timeouts.healthcheck_interval;
        if self.state.on_signal(signal, Instant::now(), drain).is_some() {
            self.accepting.set_accepting(false);
            tracing::info!(
                signal = %signal,
                drain = ?drain,
                "Termination signal received, no longer accepting new connections"
            );
        }
    }

    fn ignore_signal(&self, signal: TerminationSignal) {
        tracing::info!(signal = %signal, "Shutdown already in progress, ignoring signal");
    }

    fn server_exited(&mut self, joined: Result<Result<(), ServeError>, JoinError>) -> Termination {
        match flatten(joined) {
            Ok(()) => self.fail(ServeError::Stopped),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: ServeError) -> Termination {
        self.state.on_server_exit();
        self.accepting.set_accepting(false);
        tracing::error!(error = %error, "Server run loop exited");
        Termination::ServerFailed(error)
    }
}

/// Roughly 30 years, used when `now + duration` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

async fn next_signal(signals: &mut mpsc::Receiver<TerminationSignal>) -> TerminationSignal {
    match signals.recv().await {
        Some(signal) => signal,
        None => std::future::pending().await,
    }
}

fn flatten(joined: Result<Result<(), ServeError>, JoinError>) -> Result<(), ServeError> {
    joined.unwrap_or_else(|e| Err(ServeError::Aborted(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(drain_ms: u64, grace_ms: u64, write_ms: u64) -> TimeoutPolicy {
        TimeoutPolicy {
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_millis(write_ms),
            healthcheck_interval: Duration::from_millis(drain_ms),
            shutdown_grace: Duration::from_millis(grace_ms),
        }
    }

    /// A stand-in run loop: waits for close, reports when, lingers, exits.
    fn fake_server(linger: Duration) -> (ServerControl, oneshot::Receiver<Instant>) {
        let (close_tx, close_rx) = oneshot::channel();
        let (closed_at_tx, closed_at_rx) = oneshot::channel();
        let exit = tokio::spawn(async move {
            let _ = close_rx.await;
            let _ = closed_at_tx.send(Instant::now());
            tokio::time::sleep(linger).await;
            Ok(())
        });
        (ServerControl::new(close_tx, exit), closed_at_rx)
    }

    #[test]
    fn state_machine_is_monotonic() {
        let now = Instant::now();
        let mut state = ShutdownState::Running;

        let first = state
            .on_signal(TerminationSignal::Terminate, now, Duration::from_secs(1))
            .unwrap();
        assert_eq!(first.drain_deadline, now + Duration::from_secs(1));

        // Second signal is not re-entrant.
        let later = now + Duration::from_millis(500);
        assert!(state
            .on_signal(TerminationSignal::Interrupt, later, Duration::from_secs(1))
            .is_none());
        assert_eq!(state, ShutdownState::Draining(first));

        assert!(!state.on_closed());
        let closing = state
            .on_drain_elapsed(
                now + Duration::from_secs(1),
                Duration::from_secs(2),
                Some(Duration::from_millis(500)),
            )
            .unwrap();
        assert_eq!(closing.shutdown_deadline, Some(now + Duration::from_secs(3)));
        assert_eq!(
            closing.close_deadline,
            Some(now + Duration::from_millis(1_500))
        );
        assert!(state.on_drain_elapsed(now, Duration::ZERO, None).is_none());
        assert!(state
            .on_signal(TerminationSignal::Terminate, now, Duration::ZERO)
            .is_none());

        assert!(state.on_closed());
        assert!(state.is_terminated());
        assert!(!state.on_server_exit());
    }

    #[test]
    fn server_exit_terminates_from_running() {
        let mut state = ShutdownState::Running;
        assert!(state.on_server_exit());
        assert!(state.is_terminated());
        assert!(state
            .on_signal(TerminationSignal::Terminate, Instant::now(), Duration::ZERO)
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn clears_flag_then_closes_after_drain() {
        let accepting = AcceptingState::new();
        accepting.set_accepting(true);

        let (server, closed_at) = fake_server(Duration::from_millis(50));
        let (signal_tx, signal_rx) = mpsc::channel(4);
        let sequencer = ShutdownSequencer::new(policy(1_000, 1_000, 5_000), accepting.clone());
        let run = tokio::spawn(sequencer.run(signal_rx, server));

        tokio::task::yield_now().await;
        assert!(accepting.is_accepting());

        let sent_at = Instant::now();
        signal_tx.send(TerminationSignal::Terminate).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!accepting.is_accepting());

        let closed_at = closed_at.await.unwrap();
        assert!(closed_at - sent_at >= Duration::from_millis(1_000));
        assert!(!accepting.is_accepting());

        assert!(matches!(run.await.unwrap(), Termination::Drained));
        assert!(!accepting.is_accepting());
    }

    #[tokio::test(start_paused = true)]
    async fn second_signal_does_not_extend_drain() {
        let accepting = AcceptingState::new();
        let (server, closed_at) = fake_server(Duration::ZERO);
        let (signal_tx, signal_rx) = mpsc::channel(4);
        let sequencer = ShutdownSequencer::new(policy(1_000, 1_000, 5_000), accepting);
        let run = tokio::spawn(sequencer.run(signal_rx, server));

        let sent_at = Instant::now();
        signal_tx.send(TerminationSignal::Terminate).await.unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
        signal_tx.send(TerminationSignal::Interrupt).await.unwrap();

        let closed_at = closed_at.await.unwrap();
        let drained = closed_at - sent_at;
        assert!(drained >= Duration::from_millis(1_000));
        assert!(drained < Duration::from_millis(1_800));
        assert!(matches!(run.await.unwrap(), Termination::Drained));
    }

    #[tokio::test(start_paused = true)]
    async fn server_failure_before_signal_terminates() {
        let accepting = AcceptingState::new();
        accepting.set_accepting(true);
        let (close_tx, _close_rx) = oneshot::channel();
        let exit = tokio::spawn(async {
            Err(ServeError::Accept(std::io::Error::other("listener broke")))
        });
        let (_signal_tx, signal_rx) = mpsc::channel(4);

        let sequencer = ShutdownSequencer::new(policy(1_000, 1_000, 5_000), accepting.clone());
        let termination = sequencer
            .run(signal_rx, ServerControl::new(close_tx, exit))
            .await;

        assert!(matches!(
            termination,
            Termination::ServerFailed(ServeError::Accept(_))
        ));
        assert!(!accepting.is_accepting());
    }

    #[tokio::test(start_paused = true)]
    async fn server_failure_while_draining_clears_flag() {
        let accepting = AcceptingState::new();
        accepting.set_accepting(true);
        let (close_tx, _close_rx) = oneshot::channel();
        let exit = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Err(ServeError::Aborted("run loop panicked".into()))
        });
        let (signal_tx, signal_rx) = mpsc::channel(4);
        let sequencer = ShutdownSequencer::new(policy(1_000, 1_000, 5_000), accepting.clone());
        let run = tokio::spawn(sequencer.run(signal_rx, ServerControl::new(close_tx, exit)));

        signal_tx.send(TerminationSignal::Terminate).await.unwrap();
        assert!(matches!(
            run.await.unwrap(),
            Termination::ServerFailed(ServeError::Aborted(_))
        ));
        assert!(!accepting.is_accepting());
    }

    #[test]
    fn huge_windows_do_not_overflow_deadlines() {
        let now = Instant::now();
        let mut state = ShutdownState::Running;
        let sequence = state
            .on_signal(TerminationSignal::Terminate, now, Duration::from_secs(u64::MAX))
            .unwrap();
        assert!(sequence.drain_deadline > now);

        let closing = state
            .on_drain_elapsed(now, Duration::MAX, Some(Duration::MAX))
            .unwrap();
        assert!(closing.shutdown_deadline.unwrap() > now);
        assert!(closing.close_deadline.unwrap() > now);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_drain_window_waits_without_panicking() {
        let accepting = AcceptingState::new();
        accepting.set_accepting(true);
        let (server, _closed_at) = fake_server(Duration::ZERO);
        let (signal_tx, signal_rx) = mpsc::channel(4);
        let timeouts = TimeoutPolicy {
            healthcheck_interval: Duration::from_secs(i64::MAX as u64),
            ..policy(0, 1_000, 5_000)
        };
        let run = tokio::spawn(ShutdownSequencer::new(timeouts, accepting.clone()).run(signal_rx, server));

        signal_tx.send(TerminationSignal::Terminate).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert!(!accepting.is_accepting());
        assert!(!run.is_finished());
        run.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_close_is_bounded_by_write_timeout() {
        let accepting = AcceptingState::new();
        let (server, _closed_at) = fake_server(Duration::from_secs(60));
        let (signal_tx, signal_rx) = mpsc::channel(4);
        let sequencer = ShutdownSequencer::new(policy(100, 10_000, 500), accepting);

        let started = Instant::now();
        signal_tx.send(TerminationSignal::Terminate).await.unwrap();
        let termination = sequencer.run(signal_rx, server).await;

        assert!(matches!(termination, Termination::CloseTimedOut));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(600));
        assert!(elapsed < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_close_is_bounded_by_grace() {
        let accepting = AcceptingState::new();
        let (server, _closed_at) = fake_server(Duration::from_secs(60));
        let (signal_tx, signal_rx) = mpsc::channel(4);
        let sequencer = ShutdownSequencer::new(policy(100, 200, 5_000), accepting);

        let started = Instant::now();
        signal_tx.send(TerminationSignal::Terminate).await.unwrap();
        let termination = sequencer.run(signal_rx, server).await;

        assert!(matches!(termination, Termination::CloseTimedOut));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_secs(5));
    }
}
