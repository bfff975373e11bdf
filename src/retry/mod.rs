//! Retry and repeat policies.
//!
//! A [`RetryPolicy`] answers one question: given how a retry sequence has gone
//! so far ([`RetryStatus`]), should there be another attempt, and after how
//! long? Policies are plain values:
//!
//! - **Pure**: consulting a policy has no side effects, so policies are
//!   trivially testable with [`RetryPolicy::simulate`]
//! - **Composable**: small policies combine with [`RetryPolicy::append`] and
//!   [`RetryPolicy::followed_by`]
//! - **Shareable**: policies are `Clone + Send + Sync`
//!
//! The policy is executed by [`Effect::retry`](crate::Effect::retry) and
//! [`Effect::repeat`](crate::Effect::repeat).
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use undertow::{Effect, RetryPolicy};
//!
//! let policy = RetryPolicy::exponential_backoff(Duration::from_millis(1))
//!     .append(RetryPolicy::limit_retries(3));
//!
//! let effect = Effect::succeed(42).retry(policy);
//! assert_eq!(effect.run_blocking().unwrap(), 42);
//! ```
//!
//! # Building blocks
//!
//! | Policy | Delay before retry `n` (0-based) | Stops |
//! |--------|-------------------------------|-------|
//! | `limit_retries(k)` | zero | when `n == k` |
//! | `constant_delay(d)` | `d` | never |
//! | `incremental_delay(d)` | `d * (n + 1)` | never |
//! | `exponential_backoff(d)` | `d * 2^n` | never |
//! | `fibonacci(d)` | `d * fib(n + 1)` | never |
//!
//! Schedules that never stop should be combined with a limit.
//!
//! # Jitter
//!
//! With the `jitter` feature, delays can be randomized to avoid synchronized
//! retries from many clients:
//!
//! ```toml
//! undertow = { version = "...", features = ["jitter"] }
//! ```

mod policy;
mod status;

pub use policy::{JitterStrategy, RetryPolicy};
pub use status::RetryStatus;
