//! Process lifecycle state machine.
//!
//! # States
//! ```text
//! STARTING → LISTENING → CLOSING → CLOSED            (exit 0)
//!                           └──→ FORCE_CLOSING → CLOSED (exit 1)
//! any state ───────────────────────────────→ CLOSED   (exit 1, fatal)
//! ```
//!
//! Signals are handled at most once per stage: the first one starts a
//! graceful close, a second one while still closing escalates, anything
//! later is ignored.

/// Exit status after a clean graceful shutdown.
pub const EXIT_OK: u8 = 0;

/// Exit status for startup errors, forced shutdown and faults.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Listening,
    Closing,
    ForceClosing,
    Closed,
}

/// What the controller must do in response to a termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Stop accepting and drain in-flight connections.
    Graceful,
    /// Drop in-flight connections now.
    Force,
    /// Already shutting down at full force; nothing more to do.
    Ignore,
}

#[derive(Debug)]
pub struct Lifecycle {
    state: LifecycleState,
    exit_code: Option<u8>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Starting,
            exit_code: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Exit code, once the lifecycle has reached CLOSED.
    pub fn exit_code(&self) -> Option<u8> {
        self.exit_code
    }

    /// The engine is bound and accepting. Returns false if not STARTING.
    pub fn listening(&mut self) -> bool {
        if self.state == LifecycleState::Starting {
            self.state = LifecycleState::Listening;
            true
        } else {
            false
        }
    }

    /// Record a termination signal and decide how to react.
    pub fn on_signal(&mut self) -> SignalAction {
        match self.state {
            LifecycleState::Starting | LifecycleState::Listening => {
                self.state = LifecycleState::Closing;
                SignalAction::Graceful
            }
            LifecycleState::Closing => {
                self.state = LifecycleState::ForceClosing;
                SignalAction::Force
            }
            LifecycleState::ForceClosing | LifecycleState::Closed => SignalAction::Ignore,
        }
    }

    /// The engine finished closing. Returns the process exit code.
    pub fn finish(&mut self) -> u8 {
        let code = match self.state {
            LifecycleState::Closing => EXIT_OK,
            LifecycleState::Closed => return self.exit_code.unwrap_or(EXIT_FAILURE),
            _ => EXIT_FAILURE,
        };
        self.close_with(code)
    }

    /// Unrecoverable failure from any state.
    pub fn fail(&mut self) -> u8 {
        self.close_with(EXIT_FAILURE)
    }

    fn close_with(&mut self, code: u8) -> u8 {
        self.state = LifecycleState::Closed;
        self.exit_code = Some(code);
        code
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
