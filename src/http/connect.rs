//! HTTP CONNECT tunneling.
//!
//! The flow is:
//!
//! 1. Client sends `CONNECT host:port HTTP/1.1`
//! 2. The route decision picks direct, fallback or trusted upstream
//! 3. The outbound leg is opened first, so failures become a 502
//! 4. `200` goes back to the client and the connection is upgraded
//! 5. Bytes are relayed both ways until either side closes

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use url::Url;

use crate::http::error::ProxyError;
use crate::http::request::Target;
use crate::http::response::{self, ProxyBody};
use crate::http::server::ProxyContext;
use crate::http::upstream::open_tunnel;
use crate::net::listener::ConnectionPermit;
use crate::net::ConnectionId;

/// Establish a tunnel for a CONNECT request.
pub async fn handle_connect(
    req: Request<Incoming>,
    target: Target,
    upstream: Option<Url>,
    id: ConnectionId,
    permit: Arc<ConnectionPermit>,
    ctx: Arc<ProxyContext>,
) -> Result<Response<ProxyBody>, ProxyError> {
    let mut outbound = open_tunnel(&target, upstream.as_ref()).await?;

    // Tunnels outlive the HTTP connection that requested them, and keep
    // both its tracker entry and its connection slot.
    let guard = ctx.tracker.attach(id);
    let mut shutdown = ctx.shutdown.clone();

    tokio::spawn(async move {
        let _guard = guard;
        let _permit = permit;
        let upgraded = match hyper::upgrade::on(req).await {
            Ok(upgraded) => upgraded,
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "HTTP upgrade failed");
                return;
            }
        };
        let mut client = TokioIo::new(upgraded);

        tokio::select! {
            result = tokio::io::copy_bidirectional(&mut client, &mut outbound) => match result {
                Ok((sent, received)) => tracing::debug!(
                    connection_id = %id,
                    target = %target.authority(),
                    sent,
                    received,
                    "Tunnel closed"
                ),
                Err(e) => tracing::debug!(
                    connection_id = %id,
                    target = %target.authority(),
                    error = %e,
                    "Tunnel ended"
                ),
            },
            _ = shutdown.terminating() => {
                tracing::debug!(connection_id = %id, "Tunnel terminated by forced shutdown");
            }
        }
    });

    Ok(response::empty(StatusCode::OK))
}
