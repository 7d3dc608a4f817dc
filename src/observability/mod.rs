//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with connection IDs
//!
//! Consumers:
//!     → logging.rs (stderr, filtered by RUST_LOG or DEBUG)
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted strings
//! - Connection ID flows through every event for a connection
//! - Credentials never appear in events

pub mod logging;
