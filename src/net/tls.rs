//! TLS toward `https` upstream proxies.

use std::sync::{Arc, OnceLock};

use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

static CONNECTOR: OnceLock<Result<TlsConnector, String>> = OnceLock::new();

/// Shared connector verifying upstream certificates against the system roots.
///
/// Built on first use; the root store is loaded only once per process.
pub fn connector() -> Result<TlsConnector, std::io::Error> {
    CONNECTOR
        .get_or_init(build_connector)
        .clone()
        .map_err(std::io::Error::other)
}

fn build_connector() -> Result<TlsConnector, String> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        tracing::debug!(error = %err, "Skipping unreadable native certificate");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    if roots.is_empty() {
        return Err("no system root certificates found".to_string());
    }
    tracing::debug!(added, ignored, "Loaded root certificates");

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Wrap an established TCP stream to an upstream proxy in TLS.
pub async fn connect(host: &str, stream: TcpStream) -> Result<TlsStream<TcpStream>, std::io::Error> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    connector()?.connect(server_name, stream).await
}
