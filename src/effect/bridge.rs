//! Interop with code outside the effect world.
//!
//! - [`Effect::from_async`] wraps a future factory.
//! - [`Effect::from_callback`] wraps callback-style completion through a
//!   [`Completer`].
//! - [`Effect::start`] goes the other way: it spawns the effect and hands
//!   back a [`Running`] future.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{catch, Effect};
use crate::error::{Error, Result};
use crate::runtime;

impl<T: Send + 'static> Effect<T> {
    /// Wrap an asynchronous computation.
    ///
    /// `factory` is called once per run to start a fresh computation, so the
    /// effect stays re-runnable.
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::from_async(|| async { Ok(40 + 2) });
    /// assert_eq!(effect.run_blocking().unwrap(), 42);
    /// ```
    pub fn from_async<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Effect::external(factory)
    }

    /// Wrap a computation that reports its outcome through a callback.
    ///
    /// On every run, `register` receives a fresh [`Completer`] and must hand
    /// it to whatever eventually finishes the work. If the completer is
    /// dropped without being used, the run fails with
    /// [`Error::Cancelled`].
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::from_callback(|done| {
    ///     std::thread::spawn(move || done.succeed("from another thread"));
    /// });
    /// assert_eq!(effect.run_blocking().unwrap(), "from another thread");
    /// ```
    pub fn from_callback<R>(register: R) -> Self
    where
        R: Fn(Completer<T>) + Send + Sync + 'static,
    {
        Effect::external(move || {
            let (tx, rx) = oneshot::channel();
            let registered = catch(|| register(Completer { tx }));
            async move {
                registered?;
                rx.await.unwrap_or_else(|_| {
                    Err(Error::cancelled("completer dropped without a result"))
                })
            }
        })
    }

    /// Spawn a run onto the runtime right away.
    ///
    /// Unlike [`Effect::run`], the computation makes progress even if the
    /// returned handle is never polled. Dropping the handle does not cancel
    /// it; use [`Running::abort`] for that.
    pub fn start(&self) -> Running<T> {
        let state = match runtime::handle() {
            Ok(handle) => State::Spawned(handle.spawn(self.run())),
            Err(error) => State::Failed(Some(error)),
        };
        Running { state }
    }

    /// Same as [`Effect::run_blocking`].
    pub fn try_join_blocking(&self) -> Result<T> {
        self.run_blocking()
    }
}

/// One-shot completion handle passed to [`Effect::from_callback`].
pub struct Completer<T> {
    tx: oneshot::Sender<Result<T>>,
}

impl<T> Completer<T> {
    /// Complete with a value.
    pub fn succeed(self, value: T) {
        self.complete(Ok(value));
    }

    /// Complete with a failure.
    pub fn fail(self, error: impl Into<Error>) {
        self.complete(Err(error.into()));
    }

    /// Complete with an outcome.
    ///
    /// Completing a run nobody waits for anymore is a no-op.
    pub fn complete(self, result: Result<T>) {
        let _ = self.tx.send(result);
    }

    /// Returns true if the waiting run has gone away.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("abandoned", &self.is_abandoned())
            .finish()
    }
}

/// A started effect.
///
/// Resolves to the effect's outcome. A task that panicked or was aborted
/// resolves to [`Error::Panicked`] or [`Error::Cancelled`].
pub struct Running<T> {
    state: State<T>,
}

enum State<T> {
    Spawned(JoinHandle<Result<T>>),
    Failed(Option<Error>),
}

impl<T> Running<T> {
    /// Cancel the computation at its next suspension point.
    pub fn abort(&self) {
        if let State::Spawned(handle) = &self.state {
            handle.abort();
        }
    }

    /// Returns true once the computation has finished.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Spawned(handle) => handle.is_finished(),
            State::Failed(_) => true,
        }
    }
}

impl<T> Future for Running<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            State::Spawned(handle) => Pin::new(handle)
                .poll(cx)
                .map(|joined| joined.unwrap_or_else(|e| Err(Error::from_join(e)))),
            State::Failed(error) => Poll::Ready(Err(error
                .take()
                .unwrap_or_else(|| Error::cancelled("handle polled after completion")))),
        }
    }
}

impl<T> fmt::Debug for Running<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Running")
            .field("finished", &self.is_finished())
            .finish()
    }
}
