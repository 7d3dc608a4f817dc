//! Outbound connections: straight to the destination or through an
//! upstream proxy.

use bytes::Bytes;
use http_body_util::Empty;
use hyper::client::conn::http1;
use hyper::header::{HeaderValue, HOST, PROXY_AUTHORIZATION};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use url::Url;

use crate::config::schema::basic_auth_for;
use crate::http::error::ProxyError;
use crate::http::request::Target;
use crate::net::tls;

/// A bidirectional byte stream of any concrete type.
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

pub type BoxedIo = Box<dyn Io>;

/// Open a TCP connection to the destination itself.
pub async fn dial_direct(target: &Target) -> Result<TcpStream, ProxyError> {
    TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|source| ProxyError::Connect {
            addr: target.authority(),
            source,
        })
}

/// Open a connection to an upstream proxy, with TLS for `https` proxies.
pub async fn dial_proxy(proxy: &Url) -> Result<BoxedIo, ProxyError> {
    let host = proxy
        .host_str()
        .ok_or_else(|| ProxyError::InvalidTarget(format!("upstream {} has no host", proxy)))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let port = proxy.port_or_known_default().unwrap_or(80);

    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|source| ProxyError::Connect {
            addr: format!("{}:{}", host, port),
            source,
        })?;

    if proxy.scheme() == "https" {
        let stream = tls::connect(host, stream)
            .await
            .map_err(|source| ProxyError::Tls {
                host: host.to_string(),
                source,
            })?;
        Ok(Box::new(stream))
    } else {
        Ok(Box::new(stream))
    }
}

/// Open a raw byte tunnel to `target`, optionally via an upstream proxy.
///
/// Through a proxy this issues `CONNECT` with the proxy URL's credentials
/// and hands back the upgraded stream once the proxy answers 200.
pub async fn open_tunnel(target: &Target, upstream: Option<&Url>) -> Result<BoxedIo, ProxyError> {
    let Some(proxy) = upstream else {
        return Ok(Box::new(dial_direct(target).await?));
    };

    let io = dial_proxy(proxy).await?;
    let (mut sender, conn) = http1::handshake::<_, Empty<Bytes>>(TokioIo::new(io)).await?;
    tokio::spawn(async move {
        if let Err(e) = conn.with_upgrades().await {
            tracing::debug!(error = %e, "Upstream CONNECT connection ended");
        }
    });

    let authority = target.authority();
    let mut req = Request::builder()
        .method(Method::CONNECT)
        .uri(authority.as_str())
        .header(HOST, authority.as_str())
        .body(Empty::<Bytes>::new())?;
    if let Some(auth) = basic_auth_for(proxy) {
        req.headers_mut()
            .insert(PROXY_AUTHORIZATION, HeaderValue::from_str(&auth)?);
    }

    let response = sender.send_request(req).await?;
    if response.status() != StatusCode::OK {
        return Err(ProxyError::UpstreamRefused(response.status()));
    }

    let upgraded = hyper::upgrade::on(response).await?;
    Ok(Box::new(TokioIo::new(upgraded)))
}
