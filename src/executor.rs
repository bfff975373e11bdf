//! Worker dispatch for pool-deferred effects.
//!
//! [`Effect::defer_on`](crate::Effect::defer_on) hands its thunk to an
//! [`Executor`] so that the task polling the effect is never blocked by the
//! computation. The executor only has to run the job somewhere; completion is
//! reported back through a channel owned by the effect.
//!
//! Three executors are provided:
//!
//! - [`BlockingPool`]: tokio's blocking thread pool (the production default)
//! - [`ThreadPerTask`]: a fresh, named OS thread per job
//! - [`Inline`]: runs the job on the calling thread (deterministic tests)

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::runtime;

/// A unit of work submitted to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a job.
///
/// Implementations must either run the job (now or later) or return an error;
/// a job that is silently dropped surfaces as
/// [`Error::Cancelled`](crate::Error::Cancelled) to the waiting effect.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Submit a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the job was rejected.
    fn execute(&self, job: Job) -> Result<()>;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, job: Job) -> Result<()> {
        (**self).execute(job)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, job: Job) -> Result<()> {
        (**self).execute(job)
    }
}

/// Runs jobs on tokio's blocking pool.
///
/// Without an explicit handle, the caller's runtime is used, falling back to
/// the global runtime.
#[derive(Debug, Clone, Default)]
pub struct BlockingPool {
    handle: Option<Handle>,
}

impl BlockingPool {
    /// Use the caller's runtime (or the global one).
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin jobs to a specific runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl Executor for BlockingPool {
    fn execute(&self, job: Job) -> Result<()> {
        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => runtime::handle()?,
        };
        // The join handle is dropped: completion travels through the job itself.
        drop(handle.spawn_blocking(job));
        Ok(())
    }
}

/// Spawns a named OS thread per job.
#[derive(Debug, Clone)]
pub struct ThreadPerTask {
    name: String,
}

impl ThreadPerTask {
    /// Threads are named `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadPerTask {
    fn default() -> Self {
        Self::named("undertow-task")
    }
}

impl Executor for ThreadPerTask {
    fn execute(&self, job: Job) -> Result<()> {
        std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(job)
            .map(drop)
            .map_err(|e| Error::new(e).context("spawning executor thread"))
    }
}

/// Runs jobs immediately on the submitting thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Executor for Inline {
    fn execute(&self, job: Job) -> Result<()> {
        job();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_inline_runs_on_calling_thread() {
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();

        Inline
            .execute(Box::new(move || {
                tx.send(std::thread::current().id()).unwrap();
            }))
            .unwrap();

        assert_eq!(rx.recv().unwrap(), caller);
    }

    #[test]
    fn test_thread_per_task_uses_name() {
        let (tx, rx) = mpsc::channel();

        ThreadPerTask::named("probe-thread")
            .execute(Box::new(move || {
                let name = std::thread::current().name().map(str::to_owned);
                tx.send(name).unwrap();
            }))
            .unwrap();

        assert_eq!(rx.recv().unwrap().as_deref(), Some("probe-thread"));
    }

    #[test]
    fn test_blocking_pool_runs_job() {
        let (tx, rx) = mpsc::channel();

        BlockingPool::new()
            .execute(Box::new(move || tx.send(5).unwrap()))
            .unwrap();

        assert_eq!(rx.recv().unwrap(), 5);
    }

    #[test]
    fn test_shared_executor_delegates() {
        let shared: Arc<dyn Executor> = Arc::new(Inline);
        let (tx, rx) = mpsc::channel();

        shared.execute(Box::new(move || tx.send("ran").unwrap())).unwrap();

        assert_eq!(rx.recv().unwrap(), "ran");
    }
}
