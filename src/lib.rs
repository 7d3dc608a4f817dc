//! Forward proxy that splits traffic between a trusted and a fallback upstream.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::{Config, ConfigError, RawSettings};
pub use http::ProxyServer;
pub use lifecycle::{CloseMode, ProxyEngine, Shutdown};
pub use routing::{decide, ConnectionRequest, RoutingOutcome};
