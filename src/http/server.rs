//! Proxy server: the engine behind the lifecycle controller.
//!
//! # Responsibilities
//! - Bind the listener and run the accept loop
//! - Serve each connection with hyper's HTTP/1.1 server (upgrades enabled)
//! - Ask the routing callback once per request, before anything is dialed
//! - Act on the outcome: challenge, tunnel, or forward
//! - Drain or terminate connections on shutdown

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::http::connect::handle_connect;
use crate::http::forward::forward;
use crate::http::request::{client_credentials, Target};
use crate::http::response::{self, ProxyBody};
use crate::lifecycle::{CloseMode, ProxyEngine, Shutdown, ShutdownListener};
use crate::net::listener::ConnectionPermit;
use crate::net::{ConnectionGuard, ConnectionId, ConnectionTracker, Listener, ListenerError};
use crate::routing::{self, ConnectionRequest, RouteFn, RoutingOutcome};

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// State shared by every connection task.
pub struct ProxyContext {
    pub config: Arc<Config>,
    pub route: RouteFn,
    pub tracker: ConnectionTracker,
    pub shutdown: ShutdownListener,
}

/// Forward proxy server.
pub struct ProxyServer {
    config: Arc<Config>,
    route: RouteFn,
    tracker: ConnectionTracker,
    shutdown: Shutdown,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl ProxyServer {
    /// Create a server using the standard routing decision.
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_route(config, routing::decide)
    }

    /// Create a server with a custom routing callback.
    pub fn with_route(config: Arc<Config>, route: RouteFn) -> Self {
        Self {
            config,
            route,
            tracker: ConnectionTracker::new(),
            shutdown: Shutdown::new(),
            accept_task: Mutex::new(None),
        }
    }

    /// Number of live connections and tunnels.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    fn take_accept_task(&self) -> Option<JoinHandle<()>> {
        self.accept_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl ProxyEngine for ProxyServer {
    type Error = ListenerError;

    async fn listen(&self) -> Result<SocketAddr, ListenerError> {
        let listener = Listener::bind(
            &self.config.listen_host,
            self.config.listen_port,
            self.config.max_connections,
        )
        .await?;
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: format!("{}:{}", self.config.listen_host, self.config.listen_port),
            source,
        })?;

        let ctx = Arc::new(ProxyContext {
            config: Arc::clone(&self.config),
            route: self.route,
            tracker: self.tracker.clone(),
            shutdown: self.shutdown.subscribe(),
        });
        let handle = tokio::spawn(accept_loop(listener, ctx));
        *self
            .accept_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);

        Ok(local_addr)
    }

    async fn close(&self, mode: CloseMode) {
        match mode {
            CloseMode::Graceful => self.shutdown.drain(),
            CloseMode::Force => self.shutdown.terminate(),
        }

        if let Some(handle) = self.take_accept_task() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Accept loop failed");
            }
        }

        tracing::debug!(
            mode = ?mode,
            active = self.tracker.active_count(),
            "Waiting for connections to close"
        );
        self.tracker.wait_idle().await;
    }
}

async fn accept_loop(listener: Listener, ctx: Arc<ProxyContext>) {
    let mut shutdown = ctx.shutdown.clone();
    loop {
        tokio::select! {
            _ = shutdown.draining() => {
                tracing::debug!("Stopped accepting connections");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer, permit)) => {
                    let guard = ctx.tracker.track();
                    tokio::spawn(serve_connection(stream, peer, permit, guard, Arc::clone(&ctx)));
                }
                Err(ListenerError::Closed) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    permit: ConnectionPermit,
    guard: ConnectionGuard,
    ctx: Arc<ProxyContext>,
) {
    let id = guard.id();
    tracing::trace!(connection_id = %id, peer_addr = %peer, "Serving connection");

    // Shared with any tunnel this connection upgrades into, so the slot
    // stays taken until the tunnel closes too.
    let permit = Arc::new(permit);
    let service_ctx = Arc::clone(&ctx);
    let service = service_fn(move |req: Request<Incoming>| {
        let ctx = Arc::clone(&service_ctx);
        let permit = Arc::clone(&permit);
        async move { Ok::<_, Infallible>(handle_request(req, id, permit, ctx).await) }
    });

    let conn = http1::Builder::new()
        .preserve_header_case(true)
        .title_case_headers(true)
        .serve_connection(TokioIo::new(stream), service)
        .with_upgrades();
    tokio::pin!(conn);

    let mut drain = ctx.shutdown.clone();
    let mut terminate = ctx.shutdown.clone();
    let mut draining = false;

    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(connection_id = %id, error = %e, "Connection ended");
                }
                break;
            }
            _ = drain.draining(), if !draining => {
                // Finish the in-flight request, then close.
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
            _ = terminate.terminating() => {
                tracing::debug!(connection_id = %id, "Connection terminated by forced shutdown");
                break;
            }
        }
    }

    drop(guard);
}

async fn handle_request(
    req: Request<Incoming>,
    id: ConnectionId,
    permit: Arc<ConnectionPermit>,
    ctx: Arc<ProxyContext>,
) -> Response<ProxyBody> {
    let target = match Target::of(&req) {
        Ok(target) => target,
        Err(e) => {
            tracing::debug!(connection_id = %id, error = %e, "Rejected request");
            return response::error(&e);
        }
    };

    let (username, password) = client_credentials(req.headers());
    let request =
        ConnectionRequest::new(id, target.host.clone()).with_credentials(username, password);
    let outcome = (ctx.route)(&request, &ctx.config);

    let upstream = match outcome {
        RoutingOutcome::Challenge { message } => return response::challenge(&message),
        RoutingOutcome::Direct => None,
        RoutingOutcome::ViaFallback(url) | RoutingOutcome::ViaTrusted(url) => Some(url),
    };

    let result = if req.method() == Method::CONNECT {
        handle_connect(req, target.clone(), upstream, id, permit, Arc::clone(&ctx)).await
    } else {
        forward(req, &target, upstream.as_ref()).await
    };

    result.unwrap_or_else(|e| {
        tracing::warn!(
            connection_id = %id,
            target = %target.authority(),
            error = %e,
            "Request failed"
        );
        response::error(&e)
    })
}
