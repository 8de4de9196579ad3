//! Server assembly.
//!
//! `bind` creates the listener and the worker pool; `run` drives the accept
//! loop on the calling thread until shutdown, then joins the workers. Pipe
//! fds are owned here and closed only after the join, so the acceptor can
//! never write into a dead descriptor.

use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::info;

use crate::acceptor::{self, Acceptor};
use crate::config::{Config, LISTEN_BACKLOG};
use crate::error::Error;
use crate::worker::Worker;
use crate::workers::{self, WorkerHandle};

pub struct Server {
    listen_fd: RawFd,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handles: Vec<WorkerHandle>,
    /// (read, write) pipe fds per worker.
    pipes: Vec<(RawFd, RawFd)>,
}

impl Server {
    /// Bind the listener and start the worker pool. The accept loop does
    /// not run until [`run`](Server::run).
    pub fn bind(config: &Config, shutdown: Arc<AtomicBool>) -> Result<Server, Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let (listen_fd, local_addr) =
            acceptor::create_listener(addr, LISTEN_BACKLOG).map_err(Error::Listen)?;

        let num_workers = config.workers.max(1);
        let mut handles = Vec::with_capacity(num_workers);
        let mut pipes = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let worker =
                Worker::new(config.buffer_capacity, shutdown.clone()).map_err(Error::Worker)?;
            pipes.push(worker.pipe_fds());
            handles.push(workers::spawn_worker(worker_id, worker).map_err(Error::Worker)?);
        }

        info!(addr = %local_addr, workers = num_workers, "listening");

        Ok(Server {
            listen_fd,
            local_addr,
            shutdown,
            handles,
            pipes,
        })
    }

    /// The bound address; useful when port 0 requested an ephemeral port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop on the calling thread until the shutdown flag is
    /// set, then join the workers and release every fd.
    pub fn run(self) -> Result<(), Error> {
        let write_ends: Vec<RawFd> = self.pipes.iter().map(|&(_, w)| w).collect();
        let acceptor =
            Acceptor::new(self.listen_fd, write_ends, self.shutdown.clone()).map_err(Error::Epoll)?;
        acceptor.run();

        workers::join_workers(self.handles);
        for (read_fd, write_fd) in self.pipes {
            unsafe {
                libc::close(write_fd);
                libc::close(read_fd);
            }
        }
        unsafe { libc::close(self.listen_fd) };
        info!("shutdown complete");
        Ok(())
    }
}
