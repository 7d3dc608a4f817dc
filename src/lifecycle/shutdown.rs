//! Shutdown coordination for the proxy.

use tokio::sync::watch;

/// How far shutdown has progressed. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownPhase {
    Running,
    /// Stop accepting; let in-flight connections finish.
    Draining,
    /// Drop everything now.
    Terminating,
}

/// Coordinator for two-stage shutdown.
///
/// Provides a watch channel that every long-running task can subscribe to.
pub struct Shutdown {
    tx: watch::Sender<ShutdownPhase>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ShutdownPhase::Running);
        Self { tx }
    }

    /// Subscribe to shutdown progress.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Enter the draining phase.
    pub fn drain(&self) {
        self.advance(ShutdownPhase::Draining);
    }

    /// Enter the terminating phase.
    pub fn terminate(&self) {
        self.advance(ShutdownPhase::Terminating);
    }

    /// Current phase.
    pub fn phase(&self) -> ShutdownPhase {
        *self.tx.borrow()
    }

    fn advance(&self, phase: ShutdownPhase) {
        self.tx.send_if_modified(|current| {
            if phase > *current {
                *current = phase;
                true
            } else {
                false
            }
        });
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<ShutdownPhase>,
}

impl ShutdownListener {
    /// Resolves once shutdown has reached at least `phase`.
    ///
    /// Also resolves if the coordinator is gone.
    pub async fn reached(&mut self, phase: ShutdownPhase) {
        let _ = self.rx.wait_for(|current| *current >= phase).await;
    }

    /// Resolves once draining (or terminating) has begun.
    pub async fn draining(&mut self) {
        self.reached(ShutdownPhase::Draining).await
    }

    /// Resolves once terminating has begun.
    pub async fn terminating(&mut self) {
        self.reached(ShutdownPhase::Terminating).await
    }
}
