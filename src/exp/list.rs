//! Homogeneous lists of effects.

use std::fmt;
use std::sync::Arc;

use super::{collect, reported, Exp, Mode};
use crate::debug::{Debugger, EventBuilder};
use crate::effect::Effect;

/// Runs a list of effects and collects their values in input order.
///
/// ```rust
/// use undertow::exp::{Exp, ListExp};
/// use undertow::Effect;
///
/// let ids = ListExp::seq((1..=3).map(Effect::succeed));
/// assert_eq!(ids.run_blocking().unwrap(), vec![1, 2, 3]);
/// ```
pub struct ListExp<T> {
    mode: Mode,
    effects: Vec<Effect<T>>,
    report: Option<EventBuilder<Vec<T>>>,
}

impl<T: Send + 'static> ListExp<T> {
    /// Run the effects one after the other.
    pub fn seq<I>(effects: I) -> Self
    where
        I: IntoIterator<Item = Effect<T>>,
    {
        Self::with_mode(Mode::Sequential, effects)
    }

    /// Run the effects concurrently.
    pub fn par<I>(effects: I) -> Self
    where
        I: IntoIterator<Item = Effect<T>>,
    {
        Self::with_mode(Mode::Parallel, effects)
    }

    /// Build with an explicit mode.
    pub fn with_mode<I>(mode: Mode, effects: I) -> Self
    where
        I: IntoIterator<Item = Effect<T>>,
    {
        Self {
            mode,
            effects: effects.into_iter().collect(),
            report: None,
        }
    }

    /// Append one more effect.
    #[must_use]
    pub fn push(mut self, effect: impl Into<Effect<T>>) -> Self {
        self.effects.push(effect.into());
        self
    }

    /// The evaluation mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of branches.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Returns true if there are no branches.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Emit a debug event for the whole list, labelled `ListExp`, and for
    /// every branch, labelled `ListExp[index]`.
    #[must_use]
    pub fn debug_each(self, debugger: &Debugger) -> Self
    where
        T: fmt::Debug,
    {
        let effects = self
            .effects
            .into_iter()
            .enumerate()
            .map(|(i, effect)| effect.debug(debugger.expression(format!("ListExp[{i}]"))))
            .collect();
        Self {
            mode: self.mode,
            effects,
            report: Some(debugger.expression("ListExp")),
        }
    }
}

impl<T: Send + 'static> Exp for ListExp<T> {
    type Output = Vec<T>;

    fn into_effect(self) -> Effect<Vec<T>> {
        let mode = self.mode;
        let effects: Arc<[Effect<T>]> = self.effects.into();
        let list = Effect::composed(move || {
            let effects = effects.clone();
            async move { collect(&effects, mode).await }
        });
        reported(list, self.report)
    }
}

impl<T> fmt::Debug for ListExp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListExp")
            .field("mode", &self.mode)
            .field("effects", &self.effects)
            .finish()
    }
}
