//! proxy-splitter
//!
//! A forward proxy that picks an upstream for every connection.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                PROXY SPLITTER                │
//!                         │                                              │
//!     Client (CONNECT /   │  ┌─────────┐    ┌─────────┐    ┌──────────┐  │
//!     absolute-form HTTP) ┼─▶│   net   │───▶│  http   │───▶│ routing  │  │
//!                         │  │listener │    │ server  │    │ decide() │  │
//!                         │  └─────────┘    └─────────┘    └────┬─────┘  │
//!                         │                                     │        │
//!                         │         ┌───────────────┬───────────┼──────┐ │
//!                         │         ▼               ▼           ▼      ▼ │
//!                         │      direct        BAD_PROXY   GOOD_PROXY 407│
//!                         │                                              │
//!                         │  config (startup only) · lifecycle · logging │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use proxy_splitter::config::loader::is_truthy;
use proxy_splitter::config::{Config, RawSettings};
use proxy_splitter::http::ProxyServer;
use proxy_splitter::lifecycle::{self, faults, OsSignals, EXIT_FAILURE};
use proxy_splitter::observability::logging;

/// Forward proxy routing trusted hosts through GOOD_PROXY and the rest
/// through BAD_PROXY.
#[derive(Debug, Parser)]
#[command(name = "proxy-splitter", version, about)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "LISTEN_HOST")]
    listen_host: Option<String>,

    /// Port to listen on.
    #[arg(long, env = "LISTEN_PORT")]
    listen_port: Option<String>,

    /// Hosts matching this regex go through GOOD_PROXY.
    #[arg(long, env = "GOOD_HOST_REGEX")]
    good_host_regex: Option<String>,

    /// Trusted upstream proxy URL.
    #[arg(long, env = "GOOD_PROXY")]
    good_proxy: Option<String>,

    /// Fallback upstream proxy URL. Unset means direct connections.
    #[arg(long, env = "BAD_PROXY")]
    bad_proxy: Option<String>,

    /// Maximum concurrent client connections.
    #[arg(long, env = "MAX_CONNECTIONS")]
    max_connections: Option<String>,

    /// Enable debug logging.
    #[arg(long, env = "DEBUG")]
    debug: Option<String>,
}

impl From<Cli> for RawSettings {
    fn from(cli: Cli) -> Self {
        Self {
            listen_host: cli.listen_host,
            listen_port: cli.listen_port,
            good_host_regex: cli.good_host_regex,
            good_proxy: cli.good_proxy,
            bad_proxy: cli.bad_proxy,
            max_connections: cli.max_connections,
            debug: cli.debug,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    faults::install_fault_handler();

    let cli = Cli::parse();
    logging::init(is_truthy(cli.debug.as_deref()));

    tracing::info!("Starting... (hint: use DEBUG=1 to enable debug messages)");

    let resolved = match Config::resolve(cli.into()) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    for warning in &resolved.warnings {
        tracing::warn!("{}", warning);
    }

    let config = resolved.config;
    match serde_json::to_string(&config.summary()) {
        Ok(summary) => tracing::debug!(config = %summary, "Configuration loaded"),
        Err(e) => tracing::debug!(error = %e, "Configuration loaded, summary unavailable"),
    }

    let mut signals = match OsSignals::install() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let server = ProxyServer::new(Arc::new(config));
    let code = lifecycle::run(&server, &mut signals).await;
    ExitCode::from(code)
}
