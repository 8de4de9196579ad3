//! Worker thread management utilities.

use std::io;
use std::thread::{self, JoinHandle};

use crate::worker::Worker;

/// Handle to a spawned worker thread.
pub struct WorkerHandle {
    /// The thread handle
    pub handle: JoinHandle<()>,
    /// The worker ID (0-indexed)
    pub worker_id: usize,
}

/// Spawn one worker on a named thread.
pub fn spawn_worker(worker_id: usize, worker: Worker) -> io::Result<WorkerHandle> {
    let handle = thread::Builder::new()
        .name(format!("worker-{}", worker_id))
        .spawn(move || worker.run())?;
    Ok(WorkerHandle { handle, worker_id })
}

/// Wait for all worker threads to complete.
pub fn join_workers(handles: Vec<WorkerHandle>) {
    for h in handles {
        if h.handle.join().is_err() {
            tracing::error!(worker = h.worker_id, "worker thread panicked");
        }
    }
}
