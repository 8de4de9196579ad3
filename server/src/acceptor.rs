//! Accept loop.
//!
//! A single thread owns the listening socket, accepts in an edge-triggered
//! loop, and hands each new fd to a worker as one `sizeof(fd)` pipe write.
//! Worker selection is round-robin. A failed handoff drops the connection;
//! nothing is retried.

use std::io;
use std::mem;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::os::unix::io::IntoRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, trace, warn};

use crate::config::ACCEPTOR_POLL_TIMEOUT_MS;
use crate::metrics::{CONNECTIONS_ACCEPTED, CONNECTIONS_DROPPED};
use crate::poll;

/// Create the non-blocking listening socket. Returns the raw fd and the
/// bound address (which differs from the request when port 0 was asked).
pub fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<(RawFd, SocketAddr)> {
    let domain = match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    let local = socket
        .local_addr()?
        .as_socket()
        .ok_or_else(|| io::Error::other("listener has no socket address"))?;
    Ok((socket.into_raw_fd(), local))
}

pub struct Acceptor {
    listen_fd: RawFd,
    epoll_fd: RawFd,
    worker_pipes: Vec<RawFd>,
    next_worker: usize,
    shutdown: Arc<AtomicBool>,
}

impl Acceptor {
    /// Register the listening socket in a fresh epoll set. The listen fd
    /// itself stays owned by the server.
    pub fn new(
        listen_fd: RawFd,
        worker_pipes: Vec<RawFd>,
        shutdown: Arc<AtomicBool>,
    ) -> io::Result<Acceptor> {
        let epoll_fd = poll::create()?;
        if let Err(err) = poll::add(epoll_fd, listen_fd, (libc::EPOLLIN | libc::EPOLLET) as u32) {
            unsafe { libc::close(epoll_fd) };
            return Err(err);
        }
        Ok(Acceptor {
            listen_fd,
            epoll_fd,
            worker_pipes,
            next_worker: 0,
            shutdown,
        })
    }

    /// Accept until the shutdown flag is observed.
    pub fn run(mut self) {
        let mut events = [libc::epoll_event { events: 0, u64: 0 }; 1];

        while !self.shutdown.load(Ordering::Relaxed) {
            let n = match poll::wait(self.epoll_fd, &mut events, ACCEPTOR_POLL_TIMEOUT_MS) {
                Ok(n) => n,
                Err(e) => {
                    error!(error = %e, "acceptor epoll_wait failed");
                    break;
                }
            };
            if n == 0 {
                continue;
            }
            if events[0].u64 as RawFd == self.listen_fd
                && events[0].events & libc::EPOLLIN as u32 != 0
            {
                self.accept_pending();
            }
        }
        debug!("acceptor stopped");
    }

    /// Accept every pending connection; edge-triggered readiness fires once
    /// per transition, so the backlog must be drained.
    fn accept_pending(&mut self) {
        loop {
            let fd = unsafe {
                libc::accept4(
                    self.listen_fd,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                    libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                )
            };
            if fd < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::WouldBlock => break,
                    io::ErrorKind::Interrupted => continue,
                    _ => {
                        warn!(error = %err, "accept failed");
                        break;
                    }
                }
            }
            CONNECTIONS_ACCEPTED.increment();
            self.dispatch(fd);
        }
    }

    /// Hand `fd` to the next worker as a single atomic pipe write.
    fn dispatch(&mut self, fd: RawFd) {
        let idx = self.next_worker % self.worker_pipes.len();
        self.next_worker = self.next_worker.wrapping_add(1);
        let n = unsafe {
            libc::write(
                self.worker_pipes[idx],
                &fd as *const RawFd as *const libc::c_void,
                mem::size_of::<RawFd>(),
            )
        };
        if n != mem::size_of::<RawFd>() as isize {
            warn!(fd, worker = idx, "pipe handoff failed, dropping connection");
            CONNECTIONS_DROPPED.increment();
            unsafe { libc::close(fd) };
        } else {
            trace!(fd, worker = idx, "connection dispatched");
        }
    }
}

impl Drop for Acceptor {
    fn drop(&mut self) {
        unsafe { libc::close(self.epoll_fd) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_listener_binds_ephemeral_port() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let (fd, local) = create_listener(addr, 16).unwrap();
        assert_ne!(local.port(), 0);
        unsafe { libc::close(fd) };
    }
}
