//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1, one route decision per request)
//!     → request.rs (destination, client credentials)
//!     → Challenge → response.rs (407 + Proxy-Authenticate)
//!     → CONNECT   → connect.rs (tunnel) → upstream.rs
//!     → otherwise → forward.rs (plain HTTP) → upstream.rs
//! ```

pub mod connect;
pub mod error;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use error::ProxyError;
pub use server::{ProxyContext, ProxyServer};
