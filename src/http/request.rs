//! Request inspection.
//!
//! # Responsibilities
//! - Extract the destination (host, port) from CONNECT or absolute-form targets
//! - Extract client credentials from `Proxy-Authorization: Basic`
//! - Strip proxy-only headers before a request is forwarded

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hyper::header::{HeaderMap, PROXY_AUTHORIZATION};
use hyper::{Method, Request, Uri};

use crate::http::error::ProxyError;

/// Where the client wants to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Hostname or IP literal, without IPv6 brackets.
    pub host: String,
    pub port: u16,
}

impl Target {
    /// Destination of a proxy request.
    ///
    /// CONNECT uses the authority-form target (default port 443); anything
    /// else must be an absolute `http://` URI (default port 80).
    pub fn of<B>(req: &Request<B>) -> Result<Self, ProxyError> {
        if req.method() == Method::CONNECT {
            Self::from_uri(req.uri(), 443)
        } else {
            match req.uri().scheme_str() {
                Some("http") => Self::from_uri(req.uri(), 80),
                Some(other) => Err(ProxyError::InvalidTarget(format!(
                    "unsupported scheme {:?}",
                    other
                ))),
                None => Err(ProxyError::InvalidTarget(
                    "request target must be in absolute form".into(),
                )),
            }
        }
    }

    fn from_uri(uri: &Uri, default_port: u16) -> Result<Self, ProxyError> {
        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ProxyError::InvalidTarget(format!("missing host in {}", uri)))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        Ok(Self {
            host: host.to_string(),
            port: uri.port_u16().unwrap_or(default_port),
        })
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Client credentials from `Proxy-Authorization: Basic ...`.
///
/// Anything unparsable counts as no credentials, which leads to a challenge
/// when credentials are needed.
pub fn client_credentials(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let Some(value) = headers
        .get(PROXY_AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return (None, None);
    };

    let mut parts = value.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or("");
    let encoded = parts.next().unwrap_or("").trim();
    if !scheme.eq_ignore_ascii_case("basic") {
        return (None, None);
    }

    let Some(decoded) = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return (None, None);
    };

    let (username, password) = match decoded.split_once(':') {
        Some((u, p)) => (u.to_string(), p.to_string()),
        None => (decoded, String::new()),
    };
    (
        Some(username).filter(|s| !s.is_empty()),
        Some(password).filter(|s| !s.is_empty()),
    )
}

/// Remove headers addressed to this proxy rather than the next hop.
pub fn strip_proxy_headers(headers: &mut HeaderMap) {
    headers.remove(PROXY_AUTHORIZATION);
    headers.remove("proxy-connection");
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn basic(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            PROXY_AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(raw))).unwrap(),
        );
        headers
    }

    #[test]
    fn connect_target() {
        let req = Request::builder()
            .method(Method::CONNECT)
            .uri("internal.example.com:8443")
            .body(())
            .unwrap();
        let target = Target::of(&req).unwrap();
        assert_eq!(target.host, "internal.example.com");
        assert_eq!(target.port, 8443);
        assert_eq!(target.authority(), "internal.example.com:8443");
    }

    #[test]
    fn connect_target_ipv6() {
        let req = Request::builder()
            .method(Method::CONNECT)
            .uri("[::1]:443")
            .body(())
            .unwrap();
        let target = Target::of(&req).unwrap();
        assert_eq!(target.host, "::1");
        assert_eq!(target.authority(), "[::1]:443");
    }

    #[test]
    fn absolute_form_target() {
        let req = Request::builder()
            .uri("http://external.com/path?q=1")
            .body(())
            .unwrap();
        let target = Target::of(&req).unwrap();
        assert_eq!(target, Target { host: "external.com".into(), port: 80 });
    }

    #[test]
    fn origin_form_rejected() {
        let req = Request::builder().uri("/path").body(()).unwrap();
        assert!(matches!(
            Target::of(&req),
            Err(ProxyError::InvalidTarget(_))
        ));
    }

    #[test]
    fn credentials_parsed() {
        assert_eq!(
            client_credentials(&basic("alice:secret")),
            (Some("alice".into()), Some("secret".into()))
        );
        assert_eq!(
            client_credentials(&basic("alice:se:cret")),
            (Some("alice".into()), Some("se:cret".into()))
        );
        assert_eq!(
            client_credentials(&basic(":secret")),
            (None, Some("secret".into()))
        );
        assert_eq!(client_credentials(&basic("alice")), (Some("alice".into()), None));
    }

    #[test]
    fn bad_credentials_ignored() {
        assert_eq!(client_credentials(&HeaderMap::new()), (None, None));

        let mut headers = HeaderMap::new();
        headers.insert(PROXY_AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(client_credentials(&headers), (None, None));

        headers.insert(PROXY_AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert_eq!(client_credentials(&headers), (None, None));
    }

    #[test]
    fn proxy_headers_stripped() {
        let mut headers = basic("alice:secret");
        headers.insert("proxy-connection", HeaderValue::from_static("keep-alive"));
        headers.insert("accept", HeaderValue::from_static("*/*"));
        strip_proxy_headers(&mut headers);
        assert_eq!(headers.len(), 1);
    }
}
