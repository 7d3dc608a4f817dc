//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Pick the default level from the DEBUG switch
//! - Let RUST_LOG override everything
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Human-readable format on stderr, stdout stays free

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when RUST_LOG is unset.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "proxy_splitter=debug"
    } else {
        "proxy_splitter=info"
    }
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
