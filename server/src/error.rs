use std::io;

use thiserror::Error;

/// Fatal initialization failures. Anything that goes wrong after startup is
/// handled by closing the affected connection, never by propagating out of
/// the event loops.
#[derive(Debug, Error)]
pub enum Error {
    #[error("listener setup failed: {0}")]
    Listen(#[source] io::Error),

    #[error("epoll setup failed: {0}")]
    Epoll(#[source] io::Error),

    #[error("worker setup failed: {0}")]
    Worker(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
