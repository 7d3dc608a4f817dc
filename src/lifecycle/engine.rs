//! Boundary toward the proxy engine.
//!
//! The controller only needs two operations from whatever actually moves
//! bytes: start listening, and close (politely or not).

use std::future::Future;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// Stop accepting new connections, let in-flight ones finish.
    Graceful,
    /// Terminate in-flight connections immediately.
    Force,
}

/// A proxy engine the lifecycle controller can start and stop.
///
/// `close` takes `&self` so a forced close can be issued while a graceful
/// close is still pending.
pub trait ProxyEngine: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Bind and start accepting. Returns the bound address.
    fn listen(&self) -> impl Future<Output = Result<SocketAddr, Self::Error>> + Send;

    /// Stop the engine. Resolves once it has fully stopped.
    fn close(&self, mode: CloseMode) -> impl Future<Output = ()> + Send;
}
