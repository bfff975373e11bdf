//! Short-circuiting boolean combinators.

use std::fmt;
use std::sync::Arc;

use super::{collect, reported, Exp, Mode};
use crate::debug::{Debugger, EventBuilder};
use crate::effect::Effect;

/// Logical AND over boolean effects.
///
/// Sequentially, evaluation stops at the first `false`; in parallel, every
/// branch is evaluated. An empty `AllExp` is `true`.
///
/// ```rust
/// use undertow::exp::{AllExp, Exp};
/// use undertow::Effect;
///
/// let all = AllExp::seq([Effect::succeed(true), Effect::succeed(false)]);
/// assert!(!all.run_blocking().unwrap());
/// ```
pub struct AllExp {
    mode: Mode,
    effects: Vec<Effect<bool>>,
    report: Option<EventBuilder<bool>>,
}

/// Logical OR over boolean effects.
///
/// Sequentially, evaluation stops at the first `true`; in parallel, every
/// branch is evaluated. An empty `AnyExp` is `false`.
pub struct AnyExp {
    mode: Mode,
    effects: Vec<Effect<bool>>,
    report: Option<EventBuilder<bool>>,
}

macro_rules! boolean_exp {
    ($name:ident, $label:literal) => {
        impl $name {
            /// Evaluate in order, stopping at the decisive value.
            pub fn seq<I>(effects: I) -> Self
            where
                I: IntoIterator<Item = Effect<bool>>,
            {
                Self::with_mode(Mode::Sequential, effects)
            }

            /// Evaluate every branch concurrently.
            pub fn par<I>(effects: I) -> Self
            where
                I: IntoIterator<Item = Effect<bool>>,
            {
                Self::with_mode(Mode::Parallel, effects)
            }

            /// Build with an explicit mode.
            pub fn with_mode<I>(mode: Mode, effects: I) -> Self
            where
                I: IntoIterator<Item = Effect<bool>>,
            {
                Self {
                    mode,
                    effects: effects.into_iter().collect(),
                    report: None,
                }
            }

            /// Append one more branch.
            #[must_use]
            pub fn push(mut self, effect: impl Into<Effect<bool>>) -> Self {
                self.effects.push(effect.into());
                self
            }

            /// Emit a debug event for the whole expression and for every
            /// branch that runs.
            #[must_use]
            pub fn debug_each(self, debugger: &Debugger) -> Self {
                let effects = self
                    .effects
                    .into_iter()
                    .enumerate()
                    .map(|(i, e)| e.debug(debugger.expression(format!(concat!($label, "[{}]"), i))))
                    .collect();
                Self {
                    mode: self.mode,
                    effects,
                    report: Some(debugger.expression($label)),
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct($label)
                    .field("mode", &self.mode)
                    .field("effects", &self.effects)
                    .finish()
            }
        }
    };
}

boolean_exp!(AllExp, "AllExp");
boolean_exp!(AnyExp, "AnyExp");

/// Evaluate until a branch yields `decisive`; returns whether one did.
fn short_circuit(mode: Mode, effects: Vec<Effect<bool>>, decisive: bool) -> Effect<bool> {
    let effects: Arc<[Effect<bool>]> = effects.into();
    Effect::composed(move || {
        let effects = effects.clone();
        async move {
            match mode {
                Mode::Sequential => {
                    for effect in effects.iter() {
                        if effect.run().await? == decisive {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                Mode::Parallel => {
                    let values = collect(&effects, mode).await?;
                    Ok(values.contains(&decisive))
                }
            }
        }
    })
}

impl Exp for AllExp {
    type Output = bool;

    fn into_effect(self) -> Effect<bool> {
        let all = short_circuit(self.mode, self.effects, false).map(|found_false| !found_false);
        reported(all, self.report)
    }
}

impl Exp for AnyExp {
    type Output = bool;

    fn into_effect(self) -> Effect<bool> {
        reported(short_circuit(self.mode, self.effects, true), self.report)
    }
}
