//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming connection (hostname, client credentials)
//!     → router.rs (route decision)
//!     → matcher.rs (trusted host pattern)
//!     → credentials.rs (client credentials into trusted proxy URL)
//!     → Return: Direct | ViaFallback | ViaTrusted | Challenge
//! ```
//!
//! # Design Decisions
//! - Pattern compiled at startup, immutable at runtime
//! - Deterministic: same input always yields the same route
//! - No state kept between connections

pub mod credentials;
pub mod matcher;
pub mod router;

pub use router::{decide, ConnectionRequest, RouteFn, RouteMode, RoutingOutcome};
