//! Worker pool for background evaluations.

use std::future::Future;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::{ParCacheError, ParCacheResult};

/// Bounded pool of threads that run function evaluations.
///
/// Evaluations are synchronous closures run with `spawn_blocking`; the number
/// of threads is capped by `max_blocking_threads`, further work queues.
///
/// An owned pool belongs to exactly one cache and is shut down in the
/// background when dropped, so running evaluations never hold up process
/// exit. A pool built from an external [`Handle`] leaves the runtime to its
/// owner.
pub struct WorkerPool {
    handle: Handle,
    runtime: Option<Runtime>,
    threads: Option<usize>,
}

impl WorkerPool {
    /// Creates an owned pool with `threads` worker threads.
    pub fn new(threads: usize) -> ParCacheResult<Self> {
        if threads == 0 {
            return Err(ParCacheError::config(
                "worker pool needs at least one thread",
            ));
        }

        let runtime = Builder::new_current_thread()
            .max_blocking_threads(threads)
            .thread_name("parcache-worker")
            .build()?;

        tracing::debug!(threads, "Worker pool created");

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            threads: Some(threads),
        })
    }

    /// Creates an owned pool with one thread per available core.
    pub fn with_available_parallelism() -> ParCacheResult<Self> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(threads)
    }

    /// Uses the blocking pool of an existing runtime.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
            threads: None,
        }
    }

    /// Thread count of an owned pool; `None` for an external runtime.
    pub fn threads(&self) -> Option<usize> {
        self.threads
    }

    /// Whether this pool owns its runtime.
    pub fn is_owned(&self) -> bool {
        self.runtime.is_some()
    }

    /// Runs `task` on a worker thread.
    pub(crate) fn spawn<F, T>(&self, task: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.handle.spawn_blocking(task)
    }

    /// Blocks the calling thread until `future` completes.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous context.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        match &self.runtime {
            Some(runtime) => runtime.block_on(future),
            None => self.handle.block_on(future),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            tracing::debug!("Worker pool shutting down");
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .field("owned", &self.is_owned())
            .finish()
    }
}
