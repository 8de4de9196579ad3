//! Signal handling for graceful shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Install a SIGINT/SIGTERM handler.
///
/// Returns the shared shutdown flag: set once on the first signal, observed
/// by the acceptor and every worker between epoll turns. A second signal
/// forces an immediate exit for the case where a worker is wedged.
pub fn install_signal_handler() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();

    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            tracing::warn!("second shutdown signal, exiting immediately");
            std::process::exit(1);
        }
        tracing::info!("shutdown signal received, draining");
    })
    .expect("failed to install signal handler");

    shutdown
}
