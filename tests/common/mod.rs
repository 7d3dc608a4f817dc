//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use proxy_splitter::config::{Config, RawSettings};
use proxy_splitter::lifecycle::ProxyEngine;
use proxy_splitter::ProxyServer;

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// What a mock upstream proxy saw for one request.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub request_line: String,
    pub proxy_authorization: Option<String>,
}

pub type Recorder = Arc<Mutex<Vec<Recorded>>>;

/// Resolve a config listening on an ephemeral loopback port.
pub fn config(good_host_regex: &str, good_proxy: &str, bad_proxy: Option<&str>) -> Config {
    Config::resolve(RawSettings {
        listen_host: Some("127.0.0.1".into()),
        listen_port: Some("0".into()),
        good_host_regex: Some(good_host_regex.into()),
        good_proxy: Some(good_proxy.into()),
        bad_proxy: bad_proxy.map(Into::into),
        ..Default::default()
    })
    .unwrap()
    .config
}

/// Start a proxy server and return it with its bound address.
pub async fn start_proxy(config: Config) -> (Arc<ProxyServer>, SocketAddr) {
    let server = Arc::new(ProxyServer::new(Arc::new(config)));
    let addr = server.listen().await.unwrap();
    (server, addr)
}

/// Start a TCP server that echoes every byte back and closes on EOF.
pub async fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.into_split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    addr
}

/// Start a simple HTTP origin that returns a fixed body.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_head(&mut socket).await.is_none() {
                    return;
                }
                let response_str = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.len(),
                    response
                );
                let _ = socket.write_all(response_str.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock upstream proxy.
///
/// CONNECT is answered with 200 and the tunnel echoes; any other request
/// gets a fixed `via-upstream` body. Every request head is recorded.
pub async fn start_mock_upstream() -> (SocketAddr, Recorder) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorder: Recorder = Arc::default();
    let seen = Arc::clone(&recorder);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let Some(head) = read_head(&mut socket).await else {
                    return;
                };
                let recorded = parse_head(&head);
                let is_connect = recorded.request_line.starts_with("CONNECT ");
                seen.lock().unwrap().push(recorded);

                if is_connect {
                    if socket
                        .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
                        .await
                        .is_err()
                    {
                        return;
                    }
                    let (mut reader, mut writer) = socket.into_split();
                    let _ = tokio::io::copy(&mut reader, &mut writer).await;
                } else {
                    let body = "via-upstream";
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });
        }
    });

    (addr, recorder)
}

/// Send `CONNECT authority` to the proxy. Returns the response head and
/// the stream, positioned right after the head.
pub async fn connect_through(
    proxy: SocketAddr,
    authority: &str,
    credentials: Option<(&str, &str)>,
) -> (String, TcpStream) {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    send_connect(&mut stream, authority, credentials).await;

    let head = tokio::time::timeout(IO_TIMEOUT, read_head(&mut stream))
        .await
        .expect("proxy did not answer")
        .expect("proxy closed the connection");
    (head, stream)
}

/// Write a CONNECT request head without waiting for the answer.
pub async fn send_connect(
    stream: &mut TcpStream,
    authority: &str,
    credentials: Option<(&str, &str)>,
) {
    let mut request = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\n", authority);
    if let Some((user, pass)) = credentials {
        let token = STANDARD.encode(format!("{}:{}", user, pass));
        request.push_str(&format!("Proxy-Authorization: Basic {}\r\n", token));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
}

/// Write `payload` and read the same number of bytes back.
pub async fn echo_roundtrip(stream: &mut TcpStream, payload: &[u8]) -> Vec<u8> {
    stream.write_all(payload).await.unwrap();
    let mut buf = vec![0u8; payload.len()];
    tokio::time::timeout(IO_TIMEOUT, stream.read_exact(&mut buf))
        .await
        .expect("echo timed out")
        .unwrap();
    buf
}

/// Status code from an HTTP response head.
pub fn status_of(head: &str) -> u16 {
    head.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or(0)
}

/// Header value from an HTTP head, matched case-insensitively.
pub fn header_of<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}

/// Read bytes until the end of an HTTP head.
pub async fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte).await {
            Ok(1) => head.push(byte[0]),
            _ => return None,
        }
    }
    String::from_utf8(head).ok()
}

fn parse_head(head: &str) -> Recorded {
    Recorded {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        proxy_authorization: header_of(head, "proxy-authorization").map(str::to_string),
    }
}
