//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config already validated → engine.listen() → LISTENING
//!
//! Shutdown (startup.rs, shutdown.rs):
//!     1st SIGINT/SIGTERM → CLOSING → stop accepting → drain → exit 0
//!     2nd SIGINT/SIGTERM → FORCE_CLOSING → drop connections → exit 1
//!
//! Faults (faults.rs):
//!     panic anywhere → log → exit 1
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then the listener
//! - The state machine (state.rs) owns the escalation guard
//! - Graceful shutdown has no deadline; escalation is operator-driven

pub mod engine;
pub mod faults;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use engine::{CloseMode, ProxyEngine};
pub use shutdown::{Shutdown, ShutdownListener, ShutdownPhase};
pub use signals::{OsSignals, Signal, SignalSource};
pub use startup::run;
pub use state::{Lifecycle, LifecycleState, SignalAction, EXIT_FAILURE, EXIT_OK};
