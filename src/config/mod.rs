//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags / environment
//!     → RawSettings (named strings, nothing validated)
//!     → loader.rs (parse & validate, first failure aborts)
//!     → validation.rs (non-fatal warnings)
//!     → Config (validated, immutable)
//!     → shared via Arc with the engine and the lifecycle controller
//! ```
//!
//! # Design Decisions
//! - Config is immutable once resolved; there is no reload
//! - Every value arrives as a string so all errors read the same way
//! - Fatal errors and warnings are separate types

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigError, RawSettings, Resolved};
pub use schema::{Config, ProxyUrl};
pub use validation::ConfigWarning;
