//! Configuration schema definitions.
//!
//! The resolved configuration is built once at startup by
//! [`Config::resolve`](crate::config::loader) and shared read-only (via
//! `Arc`) with the routing engine and the lifecycle controller.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use url::Url;

use crate::routing::matcher::HostPattern;

/// Default bind host.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_LISTEN_PORT: &str = "8080";

/// Default cap on concurrently served client connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;

/// Root configuration for the proxy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Network address to bind. Empty means every interface.
    pub listen_host: String,

    /// Port to bind (0 picks an ephemeral port).
    pub listen_port: u16,

    /// Hostnames eligible for the trusted route.
    pub good_host_pattern: HostPattern,

    /// Trusted upstream proxy.
    pub good_proxy: ProxyUrl,

    /// Fallback upstream proxy. `None` means direct connection.
    pub bad_proxy: Option<ProxyUrl>,

    /// Whether `good_proxy` carries its own credentials.
    pub good_proxy_has_embedded_auth: bool,

    /// Maximum concurrent client connections (backpressure).
    pub max_connections: usize,

    /// Verbose diagnostics.
    pub debug: bool,
}

impl Config {
    /// Redacted view of the configuration, safe to log.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            listen_host: self.listen_host.clone(),
            listen_port: self.listen_port,
            good_host_regex: self.good_host_pattern.as_str().to_string(),
            good_proxy: self.good_proxy.redacted(),
            bad_proxy: self.bad_proxy.as_ref().map(ProxyUrl::redacted),
            good_proxy_has_auth: self.good_proxy_has_embedded_auth,
            max_connections: self.max_connections,
        }
    }
}

/// Serializable snapshot of [`Config`] for the startup debug dump.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub listen_host: String,
    pub listen_port: u16,
    pub good_host_regex: String,
    pub good_proxy: String,
    pub bad_proxy: Option<String>,
    pub good_proxy_has_auth: bool,
    pub max_connections: usize,
}

/// An upstream proxy URL.
///
/// Only constructible for absolute `http`/`https` URLs that carry a host,
/// which is what makes credential injection infallible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUrl(Url);

/// Why a string was rejected as a [`ProxyUrl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyUrlError {
    /// Not an absolute URL.
    Parse(url::ParseError),
    /// Scheme other than http/https.
    Scheme(String),
    /// Parsed, but has no host to connect to.
    MissingHost,
}

impl ProxyUrl {
    /// Parse and validate an upstream proxy URL.
    pub fn parse(input: &str) -> Result<Self, ProxyUrlError> {
        let url = Url::parse(input).map_err(ProxyUrlError::Parse)?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ProxyUrlError::Scheme(other.to_string())),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ProxyUrlError::MissingHost);
        }
        Ok(Self(url))
    }

    /// The underlying URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Percent-encoded username, empty when absent.
    pub fn username(&self) -> &str {
        self.0.username()
    }

    /// Percent-encoded password, if any.
    pub fn password(&self) -> Option<&str> {
        self.0.password()
    }

    /// True when the URL carries a non-empty username or password.
    pub fn has_credentials(&self) -> bool {
        url_has_credentials(&self.0)
    }

    /// The URL with any password masked.
    pub fn redacted(&self) -> String {
        let mut url = self.0.clone();
        if url.password().is_some() {
            let _ = url.set_password(Some("***"));
        }
        url.to_string()
    }
}

impl fmt::Display for ProxyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True when `url` carries a non-empty username or password.
pub fn url_has_credentials(url: &Url) -> bool {
    !url.username().is_empty() || url.password().is_some_and(|p| !p.is_empty())
}

/// `Proxy-Authorization` value for the credentials embedded in `url`.
///
/// Userinfo is stored percent-encoded inside the URL and is decoded before
/// being base64-encoded for the wire.
pub fn basic_auth_for(url: &Url) -> Option<String> {
    if !url_has_credentials(url) {
        return None;
    }
    let username = percent_decode_str(url.username()).decode_utf8_lossy();
    let password = percent_decode_str(url.password().unwrap_or("")).decode_utf8_lossy();
    Some(format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", username, password))
    ))
}
