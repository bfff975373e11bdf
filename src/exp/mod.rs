//! Structural combinators over effects.
//!
//! Every combinator takes a collection of effects and an evaluation [`Mode`]:
//!
//! - **Sequential**: branches run strictly in input order, each one only
//!   after the previous one completed. The first failure (or, for the boolean
//!   and conditional combinators, the first decisive value) ends the run;
//!   later branches are never started.
//! - **Parallel**: every branch is spawned as its own task. The combinator
//!   waits for *all* of them, even after a failure, and assembles results in
//!   input order. When several branches fail, the failure of the branch with
//!   the lowest input index is returned.
//!
//! ```rust
//! use undertow::exp::{Exp, ListExp, PairExp};
//! use undertow::Effect;
//!
//! let list = ListExp::par([Effect::succeed(1), Effect::succeed(2), Effect::succeed(3)]);
//! assert_eq!(list.run_blocking().unwrap(), vec![1, 2, 3]);
//!
//! let pair = PairExp::seq(Effect::succeed("id"), Effect::succeed(7));
//! assert_eq!(pair.run_blocking().unwrap(), ("id", 7));
//! ```
//!
//! A combinator is a description like any effect: convert it with
//! [`Exp::into_effect`] (or `Effect::from`) to keep composing, retrying or
//! decorating it.

mod boolean;
mod cond;
mod if_else;
mod json;
mod list;
mod switch;
mod tuple;

use futures::future::join_all;

use crate::debug::EventBuilder;
use crate::effect::Effect;
use crate::error::Result;

pub use boolean::{AllExp, AnyExp};
pub use cond::{CondBuilder, CondExp};
pub use if_else::{IfElseBuilder, IfElseExp, IfElseWithConsequence};
pub use json::{ArrExp, IntoJson, JsonNode, ObjExp};
pub use list::ListExp;
pub use switch::{SwitchBuilder, SwitchExp};
pub use tuple::{PairExp, TripleExp};

/// How a combinator schedules its branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// One after the other, stopping early.
    #[default]
    Sequential,
    /// All at once, waiting for every branch.
    Parallel,
}

impl Mode {
    /// Short label used in debug expressions.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Sequential => "seq",
            Mode::Parallel => "par",
        }
    }
}

/// A combinator expression that can be turned into an effect.
pub trait Exp: Sized {
    /// What the combinator produces.
    type Output: Send + 'static;

    /// The effect running this combinator.
    fn into_effect(self) -> Effect<Self::Output>;

    /// Run to completion, blocking the calling thread.
    fn run_blocking(self) -> Result<Self::Output> {
        self.into_effect().run_blocking()
    }

    /// Run to completion and return the value, panicking on failure.
    fn join_blocking(self) -> Self::Output {
        self.into_effect().join_blocking()
    }
}

/// Run every effect under `mode`, collecting values in input order.
pub(crate) async fn collect<T: Send + 'static>(effects: &[Effect<T>], mode: Mode) -> Result<Vec<T>> {
    match mode {
        Mode::Sequential => {
            let mut values = Vec::with_capacity(effects.len());
            for effect in effects {
                values.push(effect.run().await?);
            }
            Ok(values)
        }
        Mode::Parallel => {
            let running: Vec<_> = effects.iter().map(Effect::start).collect();
            // Every branch reports before the first failure (by index) wins.
            join_all(running).await.into_iter().collect()
        }
    }
}

/// Decorate an assembled combinator with its whole-expression event, if any.
pub(crate) fn reported<T: Send + 'static>(effect: Effect<T>, report: Option<EventBuilder<T>>) -> Effect<T> {
    match report {
        Some(builder) => effect.debug(builder),
        None => effect,
    }
}

macro_rules! impl_into_effect {
    ($name:ident < $($param:ident),+ > => $output:ty) => {
        impl<$($param: Send + 'static),+> From<$name<$($param),+>> for Effect<$output> {
            fn from(exp: $name<$($param),+>) -> Self {
                exp.into_effect()
            }
        }
    };
    ($name:ident => $output:ty) => {
        impl From<$name> for Effect<$output> {
            fn from(exp: $name) -> Self {
                exp.into_effect()
            }
        }
    };
}

impl_into_effect!(ListExp<T> => Vec<T>);
impl_into_effect!(PairExp<A, B> => (A, B));
impl_into_effect!(TripleExp<A, B, C> => (A, B, C));
impl_into_effect!(IfElseExp<T> => T);
impl_into_effect!(CondExp<T> => T);
impl_into_effect!(AllExp => bool);
impl_into_effect!(AnyExp => bool);
impl_into_effect!(ObjExp => serde_json::Value);
impl_into_effect!(ArrExp => serde_json::Value);
impl_into_effect!(SwitchExp<I, O> => O);
