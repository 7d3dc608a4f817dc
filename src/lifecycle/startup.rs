//! Lifecycle controller.
//!
//! # Responsibilities
//! - Start the engine; a bind failure is fatal
//! - Wait for a termination signal, then close gracefully
//! - Escalate to a forced close on a second signal
//! - Report the process exit code
//!
//! # Design Decisions
//! - Configuration is validated before this runs, so nothing binds on bad input
//! - No timer on graceful close: only the operator escalates

use crate::lifecycle::engine::{CloseMode, ProxyEngine};
use crate::lifecycle::signals::SignalSource;
use crate::lifecycle::state::{Lifecycle, SignalAction};

/// Drive `engine` from start to stop. Returns the process exit code.
pub async fn run<E, S>(engine: &E, signals: &mut S) -> u8
where
    E: ProxyEngine,
    S: SignalSource,
{
    let mut lifecycle = Lifecycle::new();

    match engine.listen().await {
        Ok(addr) => {
            lifecycle.listening();
            tracing::info!(address = %addr, "Listening");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to start");
            return lifecycle.fail();
        }
    }

    match signals.recv().await {
        Some(signal) => tracing::info!(%signal, "Closing server..."),
        None => tracing::warn!("Signal source closed, closing server..."),
    }
    lifecycle.on_signal();

    let graceful = engine.close(CloseMode::Graceful);
    tokio::pin!(graceful);

    loop {
        tokio::select! {
            _ = &mut graceful => {
                tracing::info!("Server closed");
                return lifecycle.finish();
            }
            signal = signals.recv() => {
                let Some(signal) = signal else {
                    // No escalation possible any more; just wait.
                    (&mut graceful).await;
                    tracing::info!("Server closed");
                    return lifecycle.finish();
                };
                if lifecycle.on_signal() == SignalAction::Force {
                    tracing::warn!(%signal, "Forcing exit...");
                    engine.close(CloseMode::Force).await;
                    return lifecycle.finish();
                }
            }
        }
    }
}
