//! Transformations, recovery and time limits.
//!
//! Transformations of a ready effect stay ready, so chains of `map`,
//! `recover` and friends over synchronous effects still run without a
//! runtime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use super::{catch, Effect, Repr};
use crate::error::{Error, Result};

impl<T: Send + 'static> Effect<T> {
    /// Rewrite the outcome of every run with `g`.
    fn transform<U, G>(self, g: G) -> Effect<U>
    where
        U: Send + 'static,
        G: Fn(Result<T>) -> Result<U> + Send + Sync + 'static,
    {
        if let Repr::Ready(thunk) = &self.repr {
            let thunk = thunk.clone();
            return Effect::ready(move || g(thunk()));
        }
        let g = Arc::new(g);
        Effect::composed(move || {
            let run = self.run();
            let g = g.clone();
            async move { g(run.await) }
        })
    }

    /// Transform the success value.
    ///
    /// Failures pass through untouched and `f` is not called.
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::succeed(5).map(|x| x * 2);
    /// assert_eq!(effect.run_blocking().unwrap(), 10);
    /// ```
    pub fn map<U, F>(self, f: F) -> Effect<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.transform(move |result| result.map(&f))
    }

    /// Sequence a dependent effect.
    ///
    /// If this effect fails, `f` is never called and the failure propagates.
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::succeed(5).and_then(|x| Effect::succeed(x + 1));
    /// assert_eq!(effect.run_blocking().unwrap(), 6);
    /// ```
    pub fn and_then<U, F>(self, f: F) -> Effect<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Effect<U> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Effect::composed(move || {
            let first = self.run();
            let f = f.clone();
            async move {
                let value = first.await?;
                f(value).run().await
            }
        })
    }

    /// Transform the failure.
    pub fn map_err<F>(self, f: F) -> Self
    where
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        self.transform(move |result| result.map_err(&f))
    }

    /// Turn a failure into a success value.
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<i32>::fail("boom").recover(|_| 0);
    /// assert_eq!(effect.run_blocking().unwrap(), 0);
    /// ```
    pub fn recover<F>(self, f: F) -> Self
    where
        F: Fn(Error) -> T + Send + Sync + 'static,
    {
        self.transform(move |result| result.or_else(|error| Ok(f(error))))
    }

    /// Turn a failure into another effect.
    pub fn recover_with<F>(self, f: F) -> Self
    where
        F: Fn(Error) -> Effect<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Effect::composed(move || {
            let first = self.run();
            let f = f.clone();
            async move {
                match first.await {
                    Ok(value) => Ok(value),
                    Err(error) => f(error).run().await,
                }
            }
        })
    }

    /// On failure, try `fallback` instead.
    ///
    /// If the fallback fails as well, the original failure is kept.
    pub fn fallback_to(self, fallback: Effect<T>) -> Self {
        Effect::composed(move || {
            let first = self.run();
            let fallback = fallback.clone();
            async move {
                match first.await {
                    Ok(value) => Ok(value),
                    Err(original) => fallback.run().await.map_err(|_| original),
                }
            }
        })
    }

    /// Fail with `error_fn(&value)` unless `predicate(&value)` holds.
    ///
    /// ```rust
    /// use undertow::{Effect, Error};
    ///
    /// let age = Effect::succeed(15).check(|a| *a >= 18, |a| Error::msg(format!("too young: {a}")));
    /// assert_eq!(age.run_blocking().unwrap_err().to_string(), "too young: 15");
    /// ```
    pub fn check<P, F>(self, predicate: P, error_fn: F) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
        F: Fn(&T) -> Error + Send + Sync + 'static,
    {
        self.transform(move |result| {
            let value = result?;
            if predicate(&value) {
                Ok(value)
            } else {
                Err(error_fn(&value))
            }
        })
    }

    /// Wrap any failure with a context message.
    ///
    /// ```rust
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<()>::fail("connection refused")
    ///     .context("connecting to database")
    ///     .context("loading profile");
    ///
    /// let error = effect.run_blocking().unwrap_err();
    /// assert_eq!(error.context_trail(), vec!["connecting to database", "loading profile"]);
    /// ```
    pub fn context(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.transform(move |result| result.map_err(|error| error.context(message.clone())))
    }

    /// Observe the outcome without changing it.
    ///
    /// A panic inside either callback is logged at `warn` and otherwise
    /// ignored; the original outcome is returned.
    pub fn peek<S, F>(self, on_success: S, on_failure: F) -> Self
    where
        S: Fn(&T) + Send + Sync + 'static,
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.transform(move |result| {
            let observed = match &result {
                Ok(value) => catch(|| on_success(value)),
                Err(error) => catch(|| on_failure(error)),
            };
            if let Err(panic) = observed {
                tracing::warn!(error = %panic, "peek callback panicked; outcome preserved");
            }
            result
        })
    }

    /// Observe successes only.
    pub fn peek_success<S>(self, on_success: S) -> Self
    where
        S: Fn(&T) + Send + Sync + 'static,
    {
        self.peek(on_success, |_| {})
    }

    /// Observe failures only.
    pub fn peek_failure<F>(self, on_failure: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.peek(|_| {}, on_failure)
    }

    /// Run `other` after this effect and pair the results.
    pub fn zip<U>(self, other: Effect<U>) -> Effect<(T, U)>
    where
        U: Send + 'static,
    {
        Effect::composed(move || {
            let first = self.run();
            let second = other.clone();
            async move {
                let a = first.await?;
                let b = second.run().await?;
                Ok((a, b))
            }
        })
    }

    /// Fail with [`Error::Timeout`] if a run takes longer than `duration`.
    ///
    /// The timer only interrupts at suspension points; a synchronous thunk
    /// runs to completion.
    pub fn timeout(self, duration: Duration) -> Self {
        Effect::composed(move || {
            let run = self.run();
            async move {
                tokio::time::timeout(duration, run)
                    .await
                    .unwrap_or_else(|_| Err(Error::timeout(duration)))
            }
        })
    }

    /// Run `fallback` if a run takes longer than `duration`.
    pub fn timeout_or_else(self, duration: Duration, fallback: Effect<T>) -> Self {
        Effect::composed(move || {
            let run = self.run();
            let fallback = fallback.clone();
            async move {
                match tokio::time::timeout(duration, run).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::debug!(?duration, "timed out, running fallback");
                        fallback.run().await
                    }
                }
            }
        })
    }

    /// Memoize the first outcome.
    ///
    /// The first run evaluates the effect; later runs, including runs of
    /// clones, replay that outcome. Concurrent first runs wait for a single
    /// evaluation.
    ///
    /// ```rust
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    /// use undertow::Effect;
    ///
    /// let calls = Arc::new(AtomicUsize::new(0));
    /// let counter = calls.clone();
    /// let effect = Effect::lazy(move || counter.fetch_add(1, Ordering::SeqCst)).cached();
    ///
    /// effect.run_blocking().unwrap();
    /// effect.clone().run_blocking().unwrap();
    /// assert_eq!(calls.load(Ordering::SeqCst), 1);
    /// ```
    pub fn cached(self) -> Self
    where
        T: Clone + Sync,
    {
        let cell: Arc<OnceCell<Result<T>>> = Arc::new(OnceCell::new());
        Effect::composed(move || {
            let cell = cell.clone();
            let inner = self.clone();
            async move { cell.get_or_init(|| inner.run()).await.clone() }
        })
    }
}
