//! # Undertow
//!
//! A small functional effect runtime.
//!
//! An [`Effect`] is a lazy, re-runnable description of a computation that
//! either succeeds with a value or fails with an [`Error`]. Effects compose
//! with ordinary combinators ([`Effect::map`], [`Effect::and_then`],
//! [`Effect::recover`], ...), retry under a [`RetryPolicy`], and are
//! assembled into larger computations with the expression builders in
//! [`exp`], each available in a sequential and a parallel flavour.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::time::Duration;
//! use undertow::exp::{Exp, PairExp};
//! use undertow::{Effect, RetryPolicy};
//!
//! let user = Effect::lazy(|| "ada".to_string());
//! let score = Effect::succeed(41).map(|n| n + 1);
//!
//! let both = PairExp::par(user, score)
//!     .into_effect()
//!     .retry(RetryPolicy::constant_delay(Duration::from_millis(10)).append(RetryPolicy::limit_retries(3)));
//!
//! assert_eq!(both.run_blocking().unwrap(), ("ada".to_string(), 42));
//! ```
//!
//! Nothing runs until [`Effect::run`], [`Effect::run_blocking`] or
//! [`Effect::start`] is called, and every call runs the whole description
//! again.
//!
//! ## Observing evaluation
//!
//! A [`Debugger`] reports one [`Event`] per decorated effect to an
//! [`EventSink`]. The default sink forwards events to `tracing`.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod clock;
pub mod debug;
mod effect;
mod error;
mod executor;
pub mod exp;
pub mod retry;
pub mod runtime;
pub mod testing;

// Re-exports
pub use clock::Clock;
pub use debug::{Debugger, Event, EventSink, Outcome};
pub use effect::{BoxFuture, Completer, Effect, Running};
pub use error::{Error, Result};
pub use executor::{BlockingPool, Executor, Inline, Job, ThreadPerTask};
pub use retry::{JitterStrategy, RetryPolicy, RetryStatus};
pub use runtime::RuntimeConfig;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::Clock;
    pub use crate::debug::Debugger;
    pub use crate::effect::Effect;
    pub use crate::error::{Error, Result};
    pub use crate::exp::{
        AllExp, AnyExp, ArrExp, CondExp, Exp, IfElseExp, IntoJson, ListExp, Mode, ObjExp, PairExp,
        SwitchExp, TripleExp,
    };
    pub use crate::retry::{RetryPolicy, RetryStatus};
}
