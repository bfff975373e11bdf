//! The `Effect` type: a lazy, re-runnable, possibly asynchronous computation.
//!
//! An [`Effect<T>`] describes work that produces a `T` or fails with an
//! [`Error`]. Nothing happens until the effect is run, and every run starts
//! the computation from scratch:
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use undertow::Effect;
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = calls.clone();
//! let effect = Effect::defer(move || Ok(counter.fetch_add(1, Ordering::SeqCst) + 1));
//!
//! assert_eq!(calls.load(Ordering::SeqCst), 0); // not run yet
//! assert_eq!(effect.run_blocking().unwrap(), 1);
//! assert_eq!(effect.run_blocking().unwrap(), 2); // re-executed
//! ```
//!
//! # Representation
//!
//! Internally an effect is one of four shapes:
//!
//! | Shape | Built by | Evaluated |
//! |-------|----------|-----------|
//! | ready | `succeed`, `fail`, `lazy`, `defer` | inline, on the polling task |
//! | deferred | `defer_on` | on the supplied [`Executor`] |
//! | external | `from_async`, `from_callback`, `sleep` | by an outside async facility |
//! | composed | every combinator | by awaiting child effects |
//!
//! Effects are cheap to clone: clones share the same description.
//!
//! # Failure capture
//!
//! Panics raised by user code while an effect is evaluated (thunks, `map`
//! functions, branch suppliers, ...) are caught and reported as
//! [`Error::Panicked`]; they never unwind out of the effect machinery. The only
//! way to turn a failure back into a panic is [`Effect::join_blocking`].

mod bridge;
mod combinators;
mod constructors;
mod retry;

use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::runtime;

pub use bridge::{Completer, Running};

/// A boxed, sendable future with a `'static` lifetime.
pub type BoxFuture<T> = futures::future::BoxFuture<'static, T>;

type Thunk<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;
type Factory<T> = Arc<dyn Fn() -> BoxFuture<Result<T>> + Send + Sync>;

/// A computation that has not run yet.
///
/// See the [module documentation](self) for an overview.
pub struct Effect<T> {
    repr: Repr<T>,
}

enum Repr<T> {
    Ready(Thunk<T>),
    Deferred {
        thunk: Thunk<T>,
        executor: Arc<dyn Executor>,
    },
    External(Factory<T>),
    Composed(Factory<T>),
}

impl<T> Clone for Repr<T> {
    fn clone(&self) -> Self {
        match self {
            Repr::Ready(thunk) => Repr::Ready(thunk.clone()),
            Repr::Deferred { thunk, executor } => Repr::Deferred {
                thunk: thunk.clone(),
                executor: executor.clone(),
            },
            Repr::External(factory) => Repr::External(factory.clone()),
            Repr::Composed(factory) => Repr::Composed(factory.clone()),
        }
    }
}

impl<T> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Effect {
            repr: self.repr.clone(),
        }
    }
}

impl<T> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Effect");
        match &self.repr {
            Repr::Ready(_) => out.field("kind", &"ready"),
            Repr::Deferred { executor, .. } => out
                .field("kind", &"deferred")
                .field("executor", executor),
            Repr::External(_) => out.field("kind", &"external"),
            Repr::Composed(_) => out.field("kind", &"composed"),
        };
        out.finish()
    }
}

impl<T: Send + 'static> Effect<T> {
    pub(crate) fn ready<F>(thunk: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Effect {
            repr: Repr::Ready(Arc::new(thunk)),
        }
    }

    pub(crate) fn deferred<F>(thunk: F, executor: Arc<dyn Executor>) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Effect {
            repr: Repr::Deferred {
                thunk: Arc::new(thunk),
                executor,
            },
        }
    }

    pub(crate) fn external<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Effect {
            repr: Repr::External(Arc::new(move || factory().boxed())),
        }
    }

    /// Build an effect out of other effects.
    ///
    /// The factory is invoked once per run and must produce a fresh future.
    pub(crate) fn composed<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Effect {
            repr: Repr::Composed(Arc::new(move || factory().boxed())),
        }
    }

    /// Returns true if running this effect needs no runtime at all.
    pub fn is_ready(&self) -> bool {
        matches!(self.repr, Repr::Ready(_))
    }

    /// Start a fresh evaluation and return its future.
    ///
    /// The returned future is lazy: nothing happens until it is polled. This
    /// is the non-blocking entry point for callers that keep composing with
    /// plain `async` code.
    ///
    /// ```
    /// use undertow::Effect;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = Effect::succeed(5).map(|x| x * 2);
    /// assert_eq!(effect.run().await.unwrap(), 10);
    /// # });
    /// ```
    pub fn run(&self) -> BoxFuture<Result<T>> {
        match &self.repr {
            Repr::Ready(thunk) => {
                let thunk = thunk.clone();
                async move { evaluate(&thunk) }.boxed()
            }
            Repr::Deferred { thunk, executor } => {
                dispatch(thunk.clone(), executor.clone()).boxed()
            }
            Repr::External(factory) | Repr::Composed(factory) => {
                let factory = factory.clone();
                AssertUnwindSafe(async move { factory().await })
                    .catch_unwind()
                    .map(|outcome| outcome.unwrap_or_else(|payload| Err(Error::from_panic(payload))))
                    .boxed()
            }
        }
    }

    /// Run to completion, blocking the calling thread.
    ///
    /// Never panics on failure: the outcome is returned for the caller to
    /// inspect. Ready effects are evaluated inline without touching a runtime.
    ///
    /// Do not call this from inside another effect; compose instead.
    ///
    /// ```
    /// use undertow::{Effect, Error};
    ///
    /// let ok = Effect::succeed(1).run_blocking();
    /// assert_eq!(ok.unwrap(), 1);
    ///
    /// let failed = Effect::<i32>::fail(Error::msg("nope")).run_blocking();
    /// assert!(failed.is_err());
    /// ```
    pub fn run_blocking(&self) -> Result<T> {
        match &self.repr {
            Repr::Ready(thunk) => evaluate(thunk),
            _ => runtime::block_on(self.run())?,
        }
    }

    /// Run to completion and return the value, raising the failure.
    ///
    /// # Panics
    ///
    /// Panics with the failure if the effect fails. A captured panic is
    /// resumed with its original message.
    pub fn join_blocking(&self) -> T {
        match self.run_blocking() {
            Ok(value) => value,
            Err(Error::Panicked { message }) => std::panic::resume_unwind(Box::new(message)),
            Err(error) => panic!("effect failed: {error}"),
        }
    }
}

fn evaluate<T>(thunk: &Thunk<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(|| thunk())).unwrap_or_else(|payload| Err(Error::from_panic(payload)))
}

/// Call user code, turning a panic into [`Error::Panicked`].
pub(crate) fn catch<R>(f: impl FnOnce() -> R) -> Result<R> {
    catch_unwind(AssertUnwindSafe(f)).map_err(Error::from_panic)
}

async fn dispatch<T: Send + 'static>(thunk: Thunk<T>, executor: Arc<dyn Executor>) -> Result<T> {
    let (tx, rx) = oneshot::channel();
    executor.execute(Box::new(move || {
        let _ = tx.send(evaluate(&thunk));
    }))?;
    match rx.await {
        Ok(result) => result,
        Err(_) => Err(Error::cancelled("executor dropped the job before it completed")),
    }
}
