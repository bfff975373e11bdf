//! Ways to create effects.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{select_all, FutureExt};

use super::Effect;
use crate::error::{Error, Result};
use crate::executor::Executor;

impl<T: Send + 'static> Effect<T> {
    /// An effect that succeeds with `value`.
    ///
    /// Every run yields a clone of the value.
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// assert_eq!(Effect::succeed("hi").run_blocking().unwrap(), "hi");
    /// ```
    pub fn succeed(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Effect::ready(move || Ok(value.clone()))
    }

    /// An effect that fails with `error`.
    pub fn fail(error: impl Into<Error>) -> Self {
        let error = error.into();
        Effect::ready(move || Err(error.clone()))
    }

    /// An effect that replays an existing outcome.
    pub fn from_result(result: Result<T>) -> Self
    where
        T: Clone + Sync,
    {
        Effect::ready(move || result.clone())
    }

    /// An effect that computes its value with an infallible function.
    ///
    /// The function runs on every run, on the polling thread.
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Effect::ready(move || Ok(f()))
    }

    /// An effect that calls a fallible function when run.
    ///
    /// The function is invoked on the thread that runs the effect. Use
    /// [`Effect::defer_on`] for work that would block that thread.
    ///
    /// ```rust
    /// use undertow::{Effect, Error};
    ///
    /// let parse = Effect::defer(|| "42".parse::<i32>().map_err(Error::new));
    /// assert_eq!(parse.run_blocking().unwrap(), 42);
    /// ```
    pub fn defer<F>(f: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Effect::ready(f)
    }

    /// An effect that calls `f` on `executor` when run.
    ///
    /// The task running the effect is suspended, not blocked, until the
    /// executor reports completion. If the executor rejects the job the
    /// effect fails with that error; if it drops the job the effect fails
    /// with [`Error::Cancelled`].
    ///
    /// ```rust
    /// use undertow::{BlockingPool, Effect};
    ///
    /// let effect = Effect::defer_on(|| Ok(std::thread::current().name().is_some()), BlockingPool::new());
    /// assert!(effect.run_blocking().is_ok());
    /// ```
    pub fn defer_on<F, X>(f: F, executor: X) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
        X: Executor + 'static,
    {
        Effect::deferred(f, Arc::new(executor))
    }

    /// Like [`Effect::defer_on`], for an executor that is already shared.
    pub fn defer_on_shared<F>(f: F, executor: Arc<dyn Executor>) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Effect::deferred(f, executor)
    }

    /// Run every effect concurrently and keep the first to finish.
    ///
    /// The others are dropped as soon as a winner is known. Whatever the
    /// winner produced, success or failure, is the outcome.
    ///
    /// # Panics
    ///
    /// Panics if `effects` is empty.
    pub fn race<I>(effects: I) -> Self
    where
        I: IntoIterator<Item = Effect<T>>,
    {
        let effects: Arc<[Effect<T>]> = effects.into_iter().collect();
        assert!(!effects.is_empty(), "race requires at least one effect");
        Effect::composed(move || {
            let runs: Vec<_> = effects.iter().map(Effect::run).collect();
            select_all(runs).map(|(outcome, _, _)| outcome)
        })
    }

    /// Acquire a resource, use it, and always release it.
    ///
    /// `release` runs whether `use_resource` succeeded or failed. When both
    /// fail, the failure from `use_resource` is kept. A release failure
    /// surfaces only when `use_resource` succeeded. If `acquire` fails,
    /// neither of the other two runs.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use undertow::Effect;
    ///
    /// let effect = Effect::bracket(
    ///     Effect::succeed(vec![1, 2, 3]),
    ///     |items: Arc<Vec<i32>>| Effect::succeed(items.iter().sum::<i32>()),
    ///     |_| Effect::unit(),
    /// );
    /// assert_eq!(effect.run_blocking().unwrap(), 6);
    /// ```
    pub fn bracket<R, U, Rel>(acquire: Effect<R>, use_resource: U, release: Rel) -> Self
    where
        R: Send + Sync + 'static,
        U: Fn(Arc<R>) -> Effect<T> + Send + Sync + 'static,
        Rel: Fn(Arc<R>) -> Effect<()> + Send + Sync + 'static,
    {
        let use_resource = Arc::new(use_resource);
        let release = Arc::new(release);
        Effect::composed(move || {
            let acquire = acquire.clone();
            let use_resource = use_resource.clone();
            let release = release.clone();
            async move {
                let resource = Arc::new(acquire.run().await?);
                let used = match super::catch(|| use_resource(resource.clone())) {
                    Ok(effect) => effect.run().await,
                    Err(error) => Err(error),
                };
                let released = match super::catch(|| release(resource)) {
                    Ok(effect) => effect.run().await,
                    Err(error) => Err(error),
                };
                match (used, released) {
                    (Ok(value), Ok(())) => Ok(value),
                    (Ok(_), Err(release_error)) => Err(release_error),
                    (Err(use_error), Ok(())) => Err(use_error),
                    (Err(use_error), Err(release_error)) => {
                        tracing::warn!(error = %release_error, "release failed after use failed");
                        Err(use_error)
                    }
                }
            }
        })
    }
}

impl Effect<()> {
    /// An effect that succeeds with `()`.
    pub fn unit() -> Self {
        Effect::ready(|| Ok(()))
    }

    /// An effect that completes after `duration`.
    ///
    /// Uses the timer of the runtime that runs it.
    pub fn sleep(duration: Duration) -> Self {
        Effect::external(move || async move {
            tokio::time::sleep(duration).await;
            Ok(())
        })
    }
}
