//! Bounded pool of reusable recognition workers.

use std::sync::{Condvar, Mutex, MutexGuard};

use tracing::debug;

use crate::error::OcrError;

/// Creates workers for a [`WorkerPool`].
pub trait WorkerFactory: Send + Sync {
    type Worker: Send;

    /// Create a fresh worker.
    fn create(&self) -> Result<Self::Worker, OcrError>;
}

/// A pool that lends at most `max_workers` workers at a time.
///
/// Workers are created lazily. A worker whose job succeeded goes back to the
/// idle list; a worker whose job failed is dropped and replaced on demand.
/// The slot is released in both cases, including when the job panics.
pub struct WorkerPool<F: WorkerFactory> {
    factory: F,
    max_workers: usize,
    state: Mutex<PoolState<F::Worker>>,
    available: Condvar,
}

struct PoolState<W> {
    idle: Vec<W>,
    checked_out: usize,
}

/// Checked-out slot. Dropping it without [`Lease::release`] frees the slot
/// and forgets the worker.
struct Lease<'a, F: WorkerFactory> {
    pool: &'a WorkerPool<F>,
    settled: bool,
}

impl<F: WorkerFactory> Lease<'_, F> {
    fn release(mut self, worker: F::Worker) {
        let mut state = self.pool.lock();
        state.idle.push(worker);
        state.checked_out -= 1;
        self.settled = true;
        self.pool.available.notify_one();
    }
}

impl<F: WorkerFactory> Drop for Lease<'_, F> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.pool.lock();
        state.checked_out -= 1;
        self.pool.available.notify_one();
    }
}

impl<F: WorkerFactory> WorkerPool<F> {
    /// Create a pool. `max_workers` is raised to at least one.
    pub fn new(factory: F, max_workers: usize) -> Self {
        Self {
            factory,
            max_workers: max_workers.max(1),
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                checked_out: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Maximum number of concurrently checked-out workers.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of workers currently lent out.
    pub fn checked_out(&self) -> usize {
        self.lock().checked_out
    }

    /// Number of workers waiting for reuse.
    pub fn idle(&self) -> usize {
        self.lock().idle.len()
    }

    /// Run a job on a pooled worker, blocking while the pool is exhausted.
    pub fn run<R>(
        &self,
        job: impl FnOnce(&mut F::Worker) -> Result<R, OcrError>,
    ) -> Result<R, OcrError> {
        let (mut worker, lease) = self.checkout()?;

        match job(&mut worker) {
            Ok(value) => {
                lease.release(worker);
                Ok(value)
            }
            Err(e) => {
                debug!("Discarding worker after failed job: {}", e);
                drop(worker);
                Err(e)
            }
        }
    }

    fn checkout(&self) -> Result<(F::Worker, Lease<'_, F>), OcrError> {
        let mut state = self.lock();
        loop {
            if let Some(worker) = state.idle.pop() {
                state.checked_out += 1;
                return Ok((worker, self.lease()));
            }
            if state.checked_out < self.max_workers {
                state.checked_out += 1;
                break;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
        drop(state);

        // The slot is reserved; creation runs outside the lock.
        let lease = self.lease();
        debug!("Creating pooled worker");
        let worker = self.factory.create()?;
        Ok((worker, lease))
    }

    fn lease(&self) -> Lease<'_, F> {
        Lease {
            pool: self,
            settled: false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<F::Worker>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
