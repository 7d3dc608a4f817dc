//! Per-connection route decision.
//!
//! # Responsibilities
//! - Map a destination hostname and client credentials to a route
//! - Decide whether the client must be challenged for credentials
//!
//! # Design Decisions
//! - Pure and synchronous: no I/O, no shared mutable state
//! - First matching rule wins; exactly one rule always matches
//! - Outcome is an enum so the upstream URL exists only where it is used

use std::fmt;

use url::Url;

use crate::config::Config;
use crate::net::connection::ConnectionId;
use crate::routing::credentials::inject;
use crate::routing::matcher::Matcher;

/// Failure message sent with an authentication challenge.
pub const NO_AUTH_MESSAGE: &str = "No authentication provided";

/// Signature of the routing callback the engine invokes per request.
pub type RouteFn = fn(&ConnectionRequest, &Config) -> RoutingOutcome;

/// What the engine knows about a connection when it asks for a route.
#[derive(Debug, Clone)]
pub struct ConnectionRequest {
    pub connection_id: ConnectionId,
    pub hostname: String,
    pub client_username: Option<String>,
    pub client_password: Option<String>,
}

impl ConnectionRequest {
    /// A request carrying no client credentials.
    pub fn new(connection_id: ConnectionId, hostname: impl Into<String>) -> Self {
        Self {
            connection_id,
            hostname: hostname.into(),
            client_username: None,
            client_password: None,
        }
    }

    /// Attach client-supplied credentials.
    pub fn with_credentials(
        mut self,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        self.client_username = username;
        self.client_password = password;
        self
    }
}

/// Route chosen for a single connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// Connect straight to the destination.
    Direct,
    /// Tunnel through the fallback proxy.
    ViaFallback(Url),
    /// Tunnel through the trusted proxy.
    ViaTrusted(Url),
    /// Ask the client for proxy credentials.
    Challenge { message: String },
}

/// Discriminant of [`RoutingOutcome`], for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMode {
    Direct,
    ViaFallback,
    ViaTrusted,
    Challenge,
}

impl fmt::Display for RouteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteMode::Direct => "direct",
            RouteMode::ViaFallback => "fallback",
            RouteMode::ViaTrusted => "trusted",
            RouteMode::Challenge => "challenge",
        };
        f.write_str(s)
    }
}

impl RoutingOutcome {
    pub fn mode(&self) -> RouteMode {
        match self {
            RoutingOutcome::Direct => RouteMode::Direct,
            RoutingOutcome::ViaFallback(_) => RouteMode::ViaFallback,
            RoutingOutcome::ViaTrusted(_) => RouteMode::ViaTrusted,
            RoutingOutcome::Challenge { .. } => RouteMode::Challenge,
        }
    }

    /// Upstream proxy to tunnel through, if any.
    pub fn upstream_proxy_url(&self) -> Option<&Url> {
        match self {
            RoutingOutcome::ViaFallback(url) | RoutingOutcome::ViaTrusted(url) => Some(url),
            _ => None,
        }
    }

    pub fn request_authentication(&self) -> bool {
        matches!(self, RoutingOutcome::Challenge { .. })
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            RoutingOutcome::Challenge { message } => Some(message),
            _ => None,
        }
    }
}

/// Decide how to route one connection.
pub fn decide(request: &ConnectionRequest, config: &Config) -> RoutingOutcome {
    let id = request.connection_id;
    let hostname = request.hostname.as_str();

    if !config.good_host_pattern.matches(hostname) {
        let outcome = match &config.bad_proxy {
            Some(proxy) => RoutingOutcome::ViaFallback(proxy.as_url().clone()),
            None => RoutingOutcome::Direct,
        };
        tracing::debug!(
            connection_id = %id,
            hostname,
            mode = %outcome.mode(),
            "Host not trusted"
        );
        return outcome;
    }

    if config.good_proxy_has_embedded_auth {
        tracing::debug!(
            connection_id = %id,
            hostname,
            mode = %RouteMode::ViaTrusted,
            "Using trusted proxy with predefined authentication"
        );
        return RoutingOutcome::ViaTrusted(config.good_proxy.as_url().clone());
    }

    let username = request.client_username.as_deref().filter(|s| !s.is_empty());
    let password = request.client_password.as_deref().filter(|s| !s.is_empty());

    if username.is_none() && password.is_none() {
        tracing::debug!(
            connection_id = %id,
            hostname,
            mode = %RouteMode::Challenge,
            "Missing authentication"
        );
        return RoutingOutcome::Challenge {
            message: NO_AUTH_MESSAGE.to_string(),
        };
    }

    tracing::debug!(
        connection_id = %id,
        hostname,
        mode = %RouteMode::ViaTrusted,
        username = username.unwrap_or(""),
        "Using trusted proxy with client authentication"
    );
    RoutingOutcome::ViaTrusted(inject(&config.good_proxy, username, password))
}
