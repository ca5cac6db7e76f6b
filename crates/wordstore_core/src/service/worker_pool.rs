//! Bounded worker pool for durable writes.
//!
//! # Responsibility
//! - Own the background threads that run store mutations.
//! - Host the per-repository dispatcher tasks.
//!
//! # Invariants
//! - At most `size` durable writes run at the same time process-wide for
//!   repositories sharing this pool.
//! - Dropping the pool never blocks the dropping thread.

use log::{info, warn};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

const WORKER_THREAD_NAME: &str = "wordstore-worker";

/// Fixed-size pool of background write slots.
///
/// Several repositories may share one pool through `Arc<WorkerPool>`; each
/// repository still applies its own mutations one at a time.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
    size: usize,
}

impl WorkerPool {
    /// Starts a pool with `size` write slots.
    ///
    /// # Errors
    /// - `InvalidInput` when `size` is zero.
    /// - Any error raised while spawning the pool threads.
    pub fn new(size: usize) -> io::Result<Self> {
        if size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "worker pool size must be at least 1",
            ));
        }

        // One async thread drives the dispatchers; writes use the bounded
        // blocking pool.
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(size)
            .thread_name(WORKER_THREAD_NAME)
            .build()?;
        let handle = runtime.handle().clone();

        info!("event=worker_pool_start module=service status=ok size={size}");
        Ok(Self {
            runtime: Some(runtime),
            handle,
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Stops the pool, waiting up to `timeout` for running writes.
    ///
    /// Writes already executing run to completion; queued commands that
    /// have not started are dropped and their callers observe `Closed`.
    pub fn shutdown(mut self, timeout: Duration) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(timeout);
            info!(
                "event=worker_pool_shutdown module=service status=ok mode=graceful timeout_ms={}",
                timeout.as_millis()
            );
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            warn!("event=worker_pool_shutdown module=service status=ok mode=background");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WorkerPool;
    use std::time::Duration;

    #[test]
    fn zero_sized_pool_is_rejected() {
        let err = WorkerPool::new(0).err().expect("size 0 must fail");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn spawned_work_runs_on_pool() {
        let pool = WorkerPool::new(2).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        pool.spawn(async move {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        });

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("wordstore-worker"));
        pool.shutdown(Duration::from_secs(1));
    }
}
