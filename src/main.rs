//! Function runtime entrypoint.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                   FUNCTION RUNTIME                   │
//!                  │                                                      │
//!   Request        │  ┌──────────┐   ┌──────────┐   ┌─────────────────┐   │
//!   ───────────────┼─▶│   net    │──▶│   http   │──▶│    function     │   │
//!                  │  │ listener │   │  server  │   │    (handler)    │   │
//!   Response       │  └──────────┘   └──────────┘   └─────────────────┘   │
//!   ◀──────────────┼──────────────────────┘                              │
//!                  │                                                      │
//!   SIGTERM ───────┼─▶ lifecycle: signals → shutdown sequencer           │
//!                  │      accepting=false → drain → close → exit          │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::process::ExitCode;

use function_runtime::config::{loader, LogFormat};
use function_runtime::observability::{logging, metrics};
use function_runtime::{function, Runtime};

/// Serverless function runtime.
///
/// Timeouts are read from the environment (`read_timeout`, `write_timeout`,
/// `healthcheck_interval`, `shutdown_grace`) as integer seconds or duration
/// literals such as `500ms` or `1m30s`.
#[derive(Parser)]
#[command(name = "function-runtime", version, about, long_about = None)]
struct Cli {
    /// Bind host (overrides `host`)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides `port`)
    #[arg(short, long)]
    port: Option<u16>,

    /// Treat SIGINT as a termination signal as well as SIGTERM
    #[arg(long)]
    handle_sigint: bool,

    /// Log output format (overrides `log_format`)
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = loader::load_from_env();
    if let Some(host) = cli.host {
        config.listener.host = host;
    }
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if cli.handle_sigint {
        config.signals.handle_interrupt = true;
    }
    if let Some(format) = cli.log_format {
        config.observability.log_format = format;
    }

    if let Err(e) = logging::init_logging(config.observability.log_format) {
        eprintln!("failed to initialize logging: {e}");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "function-runtime starting");

    if let Some(addr) = config.observability.metrics_address {
        metrics::init_metrics(addr);
    }

    match Runtime::new(config, function::echo).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error, exiting");
            ExitCode::FAILURE
        }
    }
}
