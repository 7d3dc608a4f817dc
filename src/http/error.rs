//! Per-connection engine errors.

use hyper::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The request target could not be turned into a destination.
    #[error("Invalid request target: {0}")]
    InvalidTarget(String),

    /// TCP connect to the destination or upstream proxy failed.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// TLS handshake with an https upstream proxy failed.
    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        source: std::io::Error,
    },

    /// The upstream proxy answered CONNECT with something other than 200.
    #[error("Upstream proxy refused tunnel with status {0}")]
    UpstreamRefused(StatusCode),

    #[error("HTTP error: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("Invalid request: {0}")]
    Http(#[from] hyper::http::Error),

    #[error("Invalid header value: {0}")]
    Header(#[from] hyper::header::InvalidHeaderValue),
}

impl ProxyError {
    /// Status code reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}
