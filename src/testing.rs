//! Testing utilities for code built on undertow.
//!
//! This module provides deterministic stand-ins for the capabilities effects
//! consume (clocks, call counting) and assertion macros for outcomes.
//!
//! # Examples
//!
//! ## Stub clocks
//!
//! ```rust
//! use undertow::testing::StubClock;
//! use undertow::Clock;
//!
//! let stub = StubClock::stepping(1_000, 10);
//! let clock: Clock = stub.clock();
//!
//! assert_eq!(clock.now(), 1_000);
//! assert_eq!(clock.now(), 1_010);
//! stub.advance(500);
//! assert_eq!(clock.now(), 1_520);
//! ```
//!
//! ## Assertion macros
//!
//! ```rust
//! use undertow::{assert_failure, assert_success, Effect};
//!
//! let value = assert_success!(Effect::succeed(42).run_blocking());
//! assert_eq!(value, 42);
//!
//! let error = assert_failure!(Effect::<i32>::fail("nope").run_blocking());
//! assert_eq!(error.to_string(), "nope");
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::effect::Effect;

/// A hand-driven clock.
///
/// Every read returns the current tick and then moves it forward by the
/// configured step. Clones share the same state.
#[derive(Debug, Clone)]
pub struct StubClock {
    state: Arc<Mutex<StubState>>,
}

#[derive(Debug)]
struct StubState {
    now: i64,
    step: i64,
}

impl StubClock {
    /// A clock frozen at `start` until advanced.
    pub fn starting_at(start: i64) -> Self {
        Self::stepping(start, 0)
    }

    /// A clock that moves forward by `step` after every read.
    pub fn stepping(start: i64, step: i64) -> Self {
        Self {
            state: Arc::new(Mutex::new(StubState { now: start, step })),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: i64) {
        let mut state = self.state.lock();
        state.now = state.now.saturating_add(by);
    }

    /// Jump to an absolute tick.
    pub fn set(&self, now: i64) {
        self.state.lock().now = now;
    }

    /// Current tick, without stepping.
    pub fn peek(&self) -> i64 {
        self.state.lock().now
    }

    /// Read and step, like a [`Clock`] would.
    pub fn tick(&self) -> i64 {
        let mut state = self.state.lock();
        let now = state.now;
        state.now = now.saturating_add(state.step);
        now
    }

    /// A [`Clock`] backed by this stub.
    pub fn clock(&self) -> Clock {
        let stub = self.clone();
        Clock::custom(move || stub.tick())
    }
}

impl From<StubClock> for Clock {
    fn from(stub: StubClock) -> Self {
        stub.clock()
    }
}

/// Counts how many times effects were run.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    /// A counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded calls.
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Record one call.
    pub fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Wrap `effect` so each run is counted before it starts.
    pub fn track<T: Send + 'static>(&self, effect: Effect<T>) -> Effect<T> {
        let counter = self.clone();
        Effect::lazy(move || counter.hit()).and_then(move |()| effect.clone())
    }

    /// An effect that records a call and succeeds with `value`.
    pub fn succeed<T>(&self, value: T) -> Effect<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let counter = self.clone();
        Effect::lazy(move || {
            counter.hit();
            value.clone()
        })
    }
}

/// Assert that an outcome is a success and return the value.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_success, Effect};
///
/// let n = assert_success!(Effect::succeed(1).run_blocking());
/// assert_eq!(n, 1);
/// ```
#[macro_export]
macro_rules! assert_success {
    ($result:expr) => {
        match $result {
            ::std::result::Result::Ok(value) => value,
            ::std::result::Result::Err(e) => {
                panic!("Expected success, got failure: {}", e);
            }
        }
    };
}

/// Assert that an outcome is a failure and return the error.
#[macro_export]
macro_rules! assert_failure {
    ($result:expr) => {
        match $result {
            ::std::result::Result::Err(error) => error,
            ::std::result::Result::Ok(v) => {
                panic!("Expected failure, got success: {:?}", v);
            }
        }
    };
}

/// Assert that an outcome is a failure whose message is `expected`.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_failure_message, Effect};
///
/// assert_failure_message!(Effect::<()>::fail("denied").run_blocking(), "denied");
/// ```
#[macro_export]
macro_rules! assert_failure_message {
    ($result:expr, $expected:expr) => {
        match $result {
            ::std::result::Result::Err(error) => {
                assert_eq!(error.to_string(), $expected);
            }
            ::std::result::Result::Ok(v) => {
                panic!("Expected failure {:?}, got success: {:?}", $expected, v);
            }
        }
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl Arbitrary for crate::retry::RetryStatus {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (0u32..1_000, 0u64..3_600_000, proptest::option::of(0u64..60_000))
            .prop_map(|(counter, cumulative, previous)| crate::retry::RetryStatus {
                counter,
                cumulative_delay: std::time::Duration::from_millis(cumulative),
                previous_delay: previous.map(std::time::Duration::from_millis),
            })
            .boxed()
    }
}

/// Strategy producing small, deterministic retry policies.
#[cfg(feature = "proptest")]
pub fn arb_retry_policy() -> BoxedStrategy<crate::retry::RetryPolicy> {
    use crate::retry::RetryPolicy;
    use std::time::Duration;

    let leaf = prop_oneof![
        (0u32..10).prop_map(RetryPolicy::limit_retries),
        (0u64..1_000).prop_map(|ms| RetryPolicy::constant_delay(Duration::from_millis(ms))),
        (0u64..1_000).prop_map(|ms| RetryPolicy::incremental_delay(Duration::from_millis(ms))),
        (0u64..1_000).prop_map(|ms| RetryPolicy::exponential_backoff(Duration::from_millis(ms))),
        (0u64..1_000).prop_map(|ms| RetryPolicy::fibonacci(Duration::from_millis(ms))),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.append(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.followed_by(b)),
            (inner, 0u64..5_000).prop_map(|(p, ms)| p.cap_delay(Duration::from_millis(ms))),
        ]
    })
    .boxed()
}
