//! Process-wide fault policy.
//!
//! A panic anywhere (main task, connection task, tunnel) means a defect, not
//! a per-connection condition, so the process logs it and exits with status
//! 1 instead of limping on with the remaining connections.

use crate::lifecycle::state::EXIT_FAILURE;

/// Install the panic hook. Call once, early in `main`.
pub fn install_fault_handler() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        tracing::error!(%location, %message, "Uncaught fault, exiting");
        std::process::exit(EXIT_FAILURE as i32);
    }));
}
