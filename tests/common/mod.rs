//! Shared utilities for lifecycle integration tests.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use function_runtime::config::{ListenerConfig, RuntimeConfig, TimeoutPolicy};
use function_runtime::lifecycle::{AcceptingState, TerminationSignal};
use function_runtime::{Handler, Runtime, RuntimeError};

/// A runtime serving on an ephemeral loopback port, with a hand-fed
/// signal channel in place of the OS.
pub struct TestRuntime {
    pub addr: SocketAddr,
    pub accepting: AcceptingState,
    pub signals: mpsc::Sender<TerminationSignal>,
    pub done: JoinHandle<Result<(), RuntimeError>>,
}

impl TestRuntime {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn terminate(&self) {
        self.signals
            .send(TerminationSignal::Terminate)
            .await
            .expect("runtime stopped listening for signals");
    }
}

pub fn loopback_config(timeouts: TimeoutPolicy) -> RuntimeConfig {
    RuntimeConfig {
        listener: ListenerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        timeouts,
        ..RuntimeConfig::default()
    }
}

/// Short timeouts so shutdown completes quickly in tests.
pub fn quick_timeouts() -> TimeoutPolicy {
    TimeoutPolicy {
        read_timeout: Duration::from_secs(5),
        write_timeout: Duration::from_secs(5),
        healthcheck_interval: Duration::from_millis(200),
        shutdown_grace: Duration::from_secs(2),
    }
}

pub async fn start<H: Handler>(config: RuntimeConfig, handler: H) -> TestRuntime {
    let bound = Runtime::new(config, handler)
        .bind()
        .await
        .expect("failed to bind test runtime");
    let addr = bound.local_addr();
    let accepting = bound.accepting();
    let (signals, rx) = mpsc::channel(4);
    let done = tokio::spawn(bound.serve(rx));

    // serve() flips the flag right after spawning the run loop
    for _ in 0..100 {
        if accepting.is_accepting() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    TestRuntime {
        addr,
        accepting,
        signals,
        done,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Write raw bytes and return whatever the server answers before closing
/// or going quiet. Write errors are ignored: the server may hang up early.
pub async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let _ = stream.write_all(request).await;

    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match tokio::time::timeout(Duration::from_secs(3), stream.read(&mut buf)).await {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => break,
            Ok(Ok(n)) => {
                response.extend_from_slice(&buf[..n]);
                if response.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&response).into_owned()
}
