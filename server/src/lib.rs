//! fixgate — a multi-threaded TCP server terminating FIX 4.x sessions.
//!
//! One acceptor thread owns the listening socket and hands accepted file
//! descriptors to worker threads over pipes. Each worker owns an epoll set
//! and a private connection table and runs an edge-triggered read → parse →
//! handle → write loop over fixed-capacity ring buffers.

pub mod acceptor;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod logging;
pub mod metrics;
pub mod poll;
pub mod server;
pub mod signal;
pub mod worker;
pub mod workers;

pub use config::Config;
pub use error::Error;
pub use server::Server;
