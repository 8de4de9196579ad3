//! Structured logging initialization.
//!
//! The `RUST_LOG` environment variable selects the filter; without it the
//! level defaults to `info`.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem. Call once from the binary.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true),
        )
        .init();
}
