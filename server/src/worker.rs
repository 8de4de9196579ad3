//! Epoll worker.
//!
//! Each worker owns an epoll set, a private fd → connection table, and the
//! read end of its handoff pipe. The acceptor is the pipe's only writer;
//! everything else the worker touches is single-threaded, so connection
//! state needs no locking. All data fds are registered edge-triggered and
//! both directions are drained fully before returning to `epoll_wait`.

use std::io;
use std::mem;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use protocol_fix::{parse_message, Disposition};
use tracing::{debug, error, trace, warn};

use crate::config::{MAX_EVENTS, WORKER_POLL_TIMEOUT_MS};
use crate::connection::Connection;
use crate::handler;
use crate::metrics::{
    BYTES_RECEIVED, BYTES_SENT, CONNECTIONS_ACTIVE, MESSAGES_PARSED, PARSE_ERRORS,
};
use crate::poll;

const READ_INTEREST: u32 = (libc::EPOLLIN | libc::EPOLLET) as u32;
const READ_WRITE_INTEREST: u32 = (libc::EPOLLIN | libc::EPOLLOUT | libc::EPOLLET) as u32;

pub struct Worker {
    epoll_fd: RawFd,
    pipe_read_fd: RawFd,
    pipe_write_fd: RawFd,
    connections: AHashMap<RawFd, Connection>,
    buffer_capacity: usize,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    /// Create the worker's epoll set and handoff pipe and register the
    /// pipe's read end edge-triggered.
    pub fn new(buffer_capacity: usize, shutdown: Arc<AtomicBool>) -> io::Result<Worker> {
        let epoll_fd = poll::create()?;

        let mut pipe_fds = [0 as RawFd; 2];
        let ret = unsafe { libc::pipe2(pipe_fds.as_mut_ptr(), libc::O_CLOEXEC) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(epoll_fd) };
            return Err(err);
        }
        let [pipe_read_fd, pipe_write_fd] = pipe_fds;

        // Read side non-blocking so the drain loop stops at EAGAIN. The
        // write side stays blocking: a sizeof(fd) pipe write is atomic.
        unsafe {
            let flags = libc::fcntl(pipe_read_fd, libc::F_GETFL);
            libc::fcntl(pipe_read_fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }

        if let Err(err) = poll::add(epoll_fd, pipe_read_fd, READ_INTEREST) {
            unsafe {
                libc::close(pipe_read_fd);
                libc::close(pipe_write_fd);
                libc::close(epoll_fd);
            }
            return Err(err);
        }

        Ok(Worker {
            epoll_fd,
            pipe_read_fd,
            pipe_write_fd,
            connections: AHashMap::new(),
            buffer_capacity,
            shutdown,
        })
    }

    /// Both pipe fds, (read, write). The server keeps them open until the
    /// worker has been joined so the acceptor never writes into a dead fd.
    pub fn pipe_fds(&self) -> (RawFd, RawFd) {
        (self.pipe_read_fd, self.pipe_write_fd)
    }

    /// Event loop. Runs until the shutdown flag is observed, then closes
    /// every connection and returns.
    pub fn run(mut self) {
        let mut events = vec![libc::epoll_event { events: 0, u64: 0 }; MAX_EVENTS];

        while !self.shutdown.load(Ordering::Relaxed) {
            let n = match poll::wait(self.epoll_fd, &mut events, WORKER_POLL_TIMEOUT_MS) {
                Ok(n) => n,
                Err(e) => {
                    error!(error = %e, "epoll_wait failed");
                    break;
                }
            };

            for event in &events[..n] {
                let fd = event.u64 as RawFd;
                let flags = event.events;

                if fd == self.pipe_read_fd {
                    self.drain_pipe();
                    continue;
                }
                if flags & (libc::EPOLLERR | libc::EPOLLHUP) as u32 != 0 {
                    self.close_connection(fd);
                    continue;
                }
                if flags & libc::EPOLLIN as u32 != 0 {
                    self.handle_readable(fd);
                }
                if flags & libc::EPOLLOUT as u32 != 0 {
                    self.handle_writable(fd);
                }
            }
        }

        let fds: Vec<RawFd> = self.connections.keys().copied().collect();
        for fd in fds {
            self.close_connection(fd);
        }
        debug!("worker stopped");
    }

    /// Drain raw fds queued by the acceptor and register a connection for
    /// each. Edge-triggered readiness requires reading until EAGAIN.
    fn drain_pipe(&mut self) {
        loop {
            let mut fd: RawFd = 0;
            let n = unsafe {
                libc::read(
                    self.pipe_read_fd,
                    &mut fd as *mut RawFd as *mut libc::c_void,
                    mem::size_of::<RawFd>(),
                )
            };
            if n == mem::size_of::<RawFd>() as isize {
                self.register_connection(fd);
                continue;
            }
            if n < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::WouldBlock => {}
                    io::ErrorKind::Interrupted => continue,
                    _ => error!(error = %err, "pipe read failed"),
                }
            }
            break;
        }
    }

    fn register_connection(&mut self, fd: RawFd) {
        if let Err(err) = poll::add(self.epoll_fd, fd, READ_INTEREST) {
            warn!(fd, error = %err, "failed to register connection");
            unsafe { libc::close(fd) };
            return;
        }
        self.connections
            .insert(fd, Connection::new(self.buffer_capacity));
        CONNECTIONS_ACTIVE.increment();
        trace!(fd, "connection registered");
    }

    /// Read turn: loop read → parse → handle until the socket would block,
    /// the peer closes, or a parse error ends the connection. Afterwards
    /// arm write interest iff the outbound ring holds data.
    fn handle_readable(&mut self, fd: RawFd) {
        loop {
            let read_result = match self.connections.get_mut(&fd) {
                Some(conn) => conn.inbound.write_from_socket(fd),
                None => return,
            };
            match read_result {
                Ok(0) => {
                    debug!(fd, "peer closed connection");
                    self.close_connection(fd);
                    return;
                }
                Ok(n) => {
                    BYTES_RECEIVED.add(n as u64);
                    if !self.parse_and_handle(fd) {
                        return;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(fd, error = %e, "socket read failed");
                    self.close_connection(fd);
                    return;
                }
            }
        }
        self.update_interest(fd);
    }

    /// Parse every complete message currently in the inbound ring and
    /// dispatch each to the handler. Returns `false` when the connection
    /// was closed.
    fn parse_and_handle(&mut self, fd: RawFd) -> bool {
        loop {
            let Some(conn) = self.connections.get_mut(&fd) else {
                return false;
            };
            match parse_message(&mut conn.inbound, &mut conn.message) {
                Ok(Disposition::Finished) => {
                    MESSAGES_PARSED.increment();
                    trace!(
                        fd,
                        msg_type = %String::from_utf8_lossy(&conn.message.msg_type),
                        sender = %String::from_utf8_lossy(&conn.message.sender_comp_id),
                        target = %String::from_utf8_lossy(&conn.message.target_comp_id),
                        seq = %String::from_utf8_lossy(&conn.message.seq_number),
                        "parsed message"
                    );
                    let keep = handler::handle(conn);
                    conn.message.reset();
                    if !keep {
                        self.close_connection(fd);
                        return false;
                    }
                }
                Ok(Disposition::NeedMore) => return true,
                Err(e) => {
                    PARSE_ERRORS.increment();
                    warn!(fd, error = %e, "parse error, closing connection");
                    self.close_connection(fd);
                    return false;
                }
            }
        }
    }

    /// Write turn: drain the outbound ring until the socket would block or
    /// the ring empties, then drop write interest.
    fn handle_writable(&mut self, fd: RawFd) {
        loop {
            let write_result = match self.connections.get_mut(&fd) {
                Some(conn) => {
                    if conn.outbound.is_empty() {
                        break;
                    }
                    conn.outbound.read_to_socket(fd)
                }
                None => return,
            };
            match write_result {
                Ok(0) => break,
                Ok(n) => {
                    BYTES_SENT.add(n as u64);
                }
                // Partial drain: EPOLLOUT stays armed for the next edge.
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    warn!(fd, error = %e, "socket write failed");
                    self.close_connection(fd);
                    return;
                }
            }
        }
        self.update_interest(fd);
    }

    /// Re-arm epoll interest for `fd`. EPOLL_CTL_MOD re-edges readiness
    /// that is still pending, so a read turn that backed off on a full
    /// inbound ring gets a fresh EPOLLIN after the parser consumes.
    fn update_interest(&mut self, fd: RawFd) {
        let Some(conn) = self.connections.get(&fd) else {
            return;
        };
        let interest = if conn.has_pending_write() {
            READ_WRITE_INTEREST
        } else {
            READ_INTEREST
        };
        if let Err(e) = poll::modify(self.epoll_fd, fd, interest) {
            warn!(fd, error = %e, "epoll_ctl mod failed");
            self.close_connection(fd);
        }
    }

    fn close_connection(&mut self, fd: RawFd) {
        if self.connections.remove(&fd).is_some() {
            let _ = poll::del(self.epoll_fd, fd);
            unsafe { libc::close(fd) };
            CONNECTIONS_ACTIVE.decrement();
            trace!(fd, "connection closed");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Pipe fds are owned by the server, which closes them after the
        // join; only the epoll set dies with the worker.
        unsafe { libc::close(self.epoll_fd) };
    }
}
