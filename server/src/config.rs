//! Server configuration.
//!
//! The external surface is a single TCP port; everything else is a
//! compile-time constant sized for the FIX session workload.

/// Port used when none is given or the given one is invalid.
pub const DEFAULT_PORT: u16 = 8080;

/// Capacity of each per-connection ring buffer (inbound and outbound).
pub const BUFFER_CAPACITY: usize = 1024 * 1024;

/// Maximum epoll events drained per `epoll_wait` turn.
pub const MAX_EVENTS: usize = 1024;

/// Worker `epoll_wait` timeout, bounding how long a shutdown goes unnoticed.
pub const WORKER_POLL_TIMEOUT_MS: i32 = 100;

/// Acceptor `epoll_wait` timeout.
pub const ACCEPTOR_POLL_TIMEOUT_MS: i32 = 1000;

/// TCP listen backlog.
pub const LISTEN_BACKLOG: i32 = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on. Port 0 asks the kernel for an ephemeral port,
    /// which the integration tests rely on.
    pub port: u16,
    /// Number of worker threads.
    pub workers: usize,
    /// Per-connection ring buffer capacity.
    pub buffer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            workers: num_cpus(),
            buffer_capacity: BUFFER_CAPACITY,
        }
    }
}

/// Number of online CPU cores, minimum 1.
pub fn num_cpus() -> usize {
    let ret = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if ret < 1 {
        1
    } else {
        ret as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.workers >= 1);
        assert_eq!(config.buffer_capacity, BUFFER_CAPACITY);
    }
}
