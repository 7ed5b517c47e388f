//! Generic worker-pool primitive.
//!
//! Responsibilities:
//! - accept opaque work closures for parallel execution;
//! - run each submitted closure to completion on a fixed set of worker
//!   threads (no FIFO or fairness guarantee beyond the queue order);
//! - surface submission failures so callers can treat them as
//!   infrastructure errors.
//!
//! The scheduler consumes pools through the [`WorkerPool`] trait; the
//! bundled [`ThreadPool`] is the default implementation.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use mapflow_common::{MapFlowError, Result};
use parking_lot::Mutex;
use tracing::debug;

/// Opaque unit of work accepted by a pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Parallel-execution contract consumed by the scheduler.
///
/// Implementations must run every accepted closure to completion without
/// spurious loss. A rejected submission (closed queue, shut-down pool) is
/// fatal to the submitting job.
pub trait WorkerPool: Send + Sync {
    /// Submit a closure for execution on some pool thread.
    fn submit(&self, job: Job) -> Result<()>;
}

/// Fixed-size thread pool draining a shared job queue.
///
/// Worker threads live until [`ThreadPool::shutdown`] (or drop) closes the
/// queue; in-flight and already-queued jobs still run to completion before
/// the workers exit.
pub struct ThreadPool {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Spawn a pool with `num_workers` threads (at least one).
    pub fn new(num_workers: usize) -> Result<Self> {
        let (sender, receiver) = unbounded::<Job>();

        let mut workers = Vec::with_capacity(num_workers.max(1));
        for worker_id in 0..num_workers.max(1) {
            workers.push(spawn_worker(worker_id, receiver.clone())?);
        }

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Close the queue and join all worker threads. Idempotent.
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

impl WorkerPool for ThreadPool {
    fn submit(&self, job: Job) -> Result<()> {
        let sender = self.sender.lock();
        let sender = sender
            .as_ref()
            .ok_or_else(|| MapFlowError::Infrastructure("pool is shut down".to_string()))?;
        sender
            .send(job)
            .map_err(|_| MapFlowError::Infrastructure("worker queue is closed".to_string()))
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(worker_id: usize, receiver: Receiver<Job>) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name(format!("mapflow-worker-{worker_id}"))
        .spawn(move || {
            debug!(worker = worker_id, "worker started");
            while let Ok(job) = receiver.recv() {
                job();
            }
            debug!(worker = worker_id, "worker stopped");
        })
        .map_err(|e| MapFlowError::Infrastructure(format!("worker spawn failed: {e}")))?;
    Ok(handle)
}
