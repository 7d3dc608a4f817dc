//! Plain HTTP forwarding for absolute-form requests.

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper::header::{HeaderValue, PROXY_AUTHORIZATION};
use hyper::{Request, Response, Uri};
use hyper_util::rt::TokioIo;
use url::Url;

use crate::config::schema::basic_auth_for;
use crate::http::error::ProxyError;
use crate::http::request::{strip_proxy_headers, Target};
use crate::http::response::ProxyBody;
use crate::http::upstream::{dial_direct, dial_proxy, BoxedIo};

/// Forward one request and stream the response back.
///
/// Directly, the request goes out in origin form. Through an upstream proxy
/// it keeps its absolute form and carries the proxy's credentials.
pub async fn forward(
    mut req: Request<Incoming>,
    target: &Target,
    upstream: Option<&Url>,
) -> Result<Response<ProxyBody>, ProxyError> {
    strip_proxy_headers(req.headers_mut());

    let io: BoxedIo = match upstream {
        None => {
            *req.uri_mut() = origin_form(req.uri());
            Box::new(dial_direct(target).await?)
        }
        Some(proxy) => {
            if let Some(auth) = basic_auth_for(proxy) {
                req.headers_mut()
                    .insert(PROXY_AUTHORIZATION, HeaderValue::from_str(&auth)?);
            }
            dial_proxy(proxy).await?
        }
    };

    let (mut sender, conn) = http1::handshake(TokioIo::new(io)).await?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "Outbound connection ended");
        }
    });

    let response = sender.send_request(req).await?;
    Ok(response.map(|body| body.boxed()))
}

fn origin_form(uri: &Uri) -> Uri {
    uri.path_and_query()
        .map(|pq| Uri::from(pq.clone()))
        .unwrap_or_else(|| Uri::from_static("/"))
}
