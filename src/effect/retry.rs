//! Policy-driven re-execution of effects.

use std::sync::Arc;
use std::time::Duration;

use super::Effect;
use crate::error::Error;
use crate::retry::{RetryPolicy, RetryStatus};

impl<T: Send + 'static> Effect<T> {
    /// Re-run this effect on failure, as long as `policy` allows.
    ///
    /// Each retry starts the whole effect from scratch after the delay the
    /// policy returned. Once the policy stops, the last failure is returned
    /// unchanged. Earlier failures are not kept.
    ///
    /// ```rust
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    /// use undertow::{Effect, Error, RetryPolicy};
    ///
    /// let attempts = Arc::new(AtomicU32::new(0));
    /// let counter = attempts.clone();
    /// let flaky = Effect::defer(move || {
    ///     if counter.fetch_add(1, Ordering::SeqCst) < 3 {
    ///         Err(Error::msg("transient"))
    ///     } else {
    ///         Ok("connected")
    ///     }
    /// });
    ///
    /// let result = flaky.retry(RetryPolicy::limit_retries(3)).run_blocking();
    /// assert_eq!(result.unwrap(), "connected");
    /// assert_eq!(attempts.load(Ordering::SeqCst), 4);
    /// ```
    pub fn retry(self, policy: RetryPolicy) -> Self {
        self.retry_if(|_| true, policy)
    }

    /// Like [`Effect::retry`], but only failures accepted by `predicate` are
    /// retried. Any other failure propagates immediately.
    pub fn retry_if<P>(self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Effect::composed(move || {
            let effect = self.clone();
            let policy = policy.clone();
            let predicate = predicate.clone();
            async move {
                let mut status = RetryStatus::start();
                loop {
                    let error = match effect.run().await {
                        Ok(value) => return Ok(value),
                        Err(error) => error,
                    };
                    if !predicate(&error) {
                        tracing::debug!(error = %error, "failure is not retryable");
                        return Err(error);
                    }
                    let Some(delay) = policy.delay(&status) else {
                        tracing::debug!(retries = status.counter, error = %error, "retry policy exhausted");
                        return Err(error);
                    };
                    tracing::debug!(
                        retry = status.counter + 1,
                        ?delay,
                        error = %error,
                        "retrying after failure"
                    );
                    pause(delay).await;
                    status = status.next(delay);
                }
            }
        })
    }

    /// Re-run this effect after each success, as long as `policy` allows.
    ///
    /// Returns the value of the last run. A failure stops the loop and is
    /// returned.
    ///
    /// ```rust
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    /// use undertow::{Effect, RetryPolicy};
    ///
    /// let ticks = Arc::new(AtomicU32::new(0));
    /// let counter = ticks.clone();
    /// let tick = Effect::lazy(move || counter.fetch_add(1, Ordering::SeqCst) + 1);
    ///
    /// assert_eq!(tick.repeat(RetryPolicy::limit_retries(2)).run_blocking().unwrap(), 3);
    /// ```
    pub fn repeat(self, policy: RetryPolicy) -> Self {
        self.repeat_if(|_| true, policy)
    }

    /// Like [`Effect::repeat`], but stops as soon as `predicate` rejects a
    /// value.
    pub fn repeat_if<P>(self, predicate: P, policy: RetryPolicy) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Effect::composed(move || {
            let effect = self.clone();
            let policy = policy.clone();
            let predicate = predicate.clone();
            async move {
                let mut status = RetryStatus::start();
                loop {
                    let value = effect.run().await?;
                    if !predicate(&value) {
                        return Ok(value);
                    }
                    let Some(delay) = policy.delay(&status) else {
                        return Ok(value);
                    };
                    tracing::debug!(repeat = status.counter + 1, ?delay, "repeating after success");
                    pause(delay).await;
                    status = status.next(delay);
                }
            }
        })
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
