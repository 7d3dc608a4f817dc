//! Responses generated by the proxy itself.
//!
//! Everything else the client sees comes from the destination or the
//! upstream proxy and is streamed through untouched.

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::header::{HeaderValue, CONTENT_TYPE, PROXY_AUTHENTICATE};
use hyper::{Response, StatusCode};

use crate::http::error::ProxyError;

/// Realm advertised in authentication challenges.
pub const REALM: &str = "proxy-splitter";

/// Body type for every response the proxy returns.
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

pub fn empty_body() -> ProxyBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

pub fn full_body(content: impl Into<Bytes>) -> ProxyBody {
    Full::new(content.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Empty response with the given status.
pub fn empty(status: StatusCode) -> Response<ProxyBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = status;
    response
}

/// Plain-text response.
pub fn text(status: StatusCode, message: impl Into<String>) -> Response<ProxyBody> {
    let mut response = Response::new(full_body(message.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

/// 407 asking the client for proxy credentials.
pub fn challenge(message: &str) -> Response<ProxyBody> {
    let mut response = text(StatusCode::PROXY_AUTHENTICATION_REQUIRED, message);
    if let Ok(value) = HeaderValue::try_from(format!("Basic realm=\"{}\"", REALM)) {
        response.headers_mut().insert(PROXY_AUTHENTICATE, value);
    }
    response
}

/// Error response for a failed request.
pub fn error(err: &ProxyError) -> Response<ProxyBody> {
    text(err.status(), err.to_string())
}
