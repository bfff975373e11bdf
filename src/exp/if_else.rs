//! Two-way branching.

use std::fmt;
use std::sync::Arc;

use super::{reported, Exp};
use crate::debug::{Debugger, EventBuilder};
use crate::effect::Effect;

type Supplier<T> = Arc<dyn Fn() -> Effect<T> + Send + Sync>;

/// Chooses between two branches based on a boolean effect.
///
/// Branches are given as suppliers, so the branch that is not taken is
/// never even built. The builder only produces an `IfElseExp` once both
/// branches are present:
///
/// ```rust
/// use undertow::exp::{Exp, IfElseExp};
/// use undertow::Effect;
///
/// let exp = IfElseExp::when(Effect::succeed(false))
///     .consequence(|| Effect::succeed("yes"))
///     .alternative(|| Effect::succeed("no"));
///
/// assert_eq!(exp.run_blocking().unwrap(), "no");
/// ```
pub struct IfElseExp<T> {
    predicate: Effect<bool>,
    consequence: Supplier<T>,
    alternative: Supplier<T>,
    report: Option<EventBuilder<T>>,
}

/// An [`IfElseExp`] with only its predicate.
#[derive(Debug)]
pub struct IfElseBuilder {
    predicate: Effect<bool>,
}

/// An [`IfElseExp`] still missing its alternative.
pub struct IfElseWithConsequence<T> {
    predicate: Effect<bool>,
    consequence: Supplier<T>,
}

impl IfElseExp<()> {
    /// Start a builder with the condition.
    pub fn when(predicate: impl Into<Effect<bool>>) -> IfElseBuilder {
        IfElseBuilder {
            predicate: predicate.into(),
        }
    }
}

impl IfElseBuilder {
    /// Branch taken when the predicate is `true`.
    pub fn consequence<T, F>(self, supplier: F) -> IfElseWithConsequence<T>
    where
        F: Fn() -> Effect<T> + Send + Sync + 'static,
    {
        IfElseWithConsequence {
            predicate: self.predicate,
            consequence: Arc::new(supplier),
        }
    }
}

impl<T> IfElseWithConsequence<T> {
    /// Branch taken when the predicate is `false`.
    pub fn alternative<F>(self, supplier: F) -> IfElseExp<T>
    where
        F: Fn() -> Effect<T> + Send + Sync + 'static,
    {
        IfElseExp {
            predicate: self.predicate,
            consequence: self.consequence,
            alternative: Arc::new(supplier),
            report: None,
        }
    }
}

impl<T: Send + 'static> IfElseExp<T> {
    /// Emit debug events for the predicate, the branch taken and the whole
    /// expression.
    #[must_use]
    pub fn debug_each(self, debugger: &Debugger) -> Self
    where
        T: fmt::Debug,
    {
        Self {
            predicate: self.predicate.debug(debugger.expression("IfElseExp.predicate")),
            consequence: decorate(self.consequence, debugger, "IfElseExp.consequence"),
            alternative: decorate(self.alternative, debugger, "IfElseExp.alternative"),
            report: Some(debugger.expression("IfElseExp")),
        }
    }
}

/// Wrap a supplier so the effect it builds reports under `label`.
pub(super) fn decorate<T>(supplier: Supplier<T>, debugger: &Debugger, label: &str) -> Supplier<T>
where
    T: fmt::Debug + Send + 'static,
{
    let builder = debugger.expression(label);
    Arc::new(move || supplier().debug(builder.clone()))
}

impl<T: Send + 'static> Exp for IfElseExp<T> {
    type Output = T;

    fn into_effect(self) -> Effect<T> {
        let Self {
            predicate,
            consequence,
            alternative,
            report,
        } = self;
        let chosen = predicate.and_then(move |chosen| if chosen { consequence() } else { alternative() });
        reported(chosen, report)
    }
}

impl<T> fmt::Debug for IfElseExp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IfElseExp")
            .field("predicate", &self.predicate)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Debug for IfElseWithConsequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IfElseWithConsequence")
            .field("predicate", &self.predicate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::RecordingSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tracked(value: &'static str) -> (impl Fn() -> Effect<&'static str> + Send + Sync, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let supplier = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Effect::succeed(value)
        };
        (supplier, calls)
    }

    #[test]
    fn test_false_never_builds_consequence() {
        let (consequence, consequence_calls) = tracked("x");
        let (alternative, alternative_calls) = tracked("y");

        let exp = IfElseExp::when(Effect::succeed(false))
            .consequence(consequence)
            .alternative(alternative);

        assert_eq!(exp.run_blocking().unwrap(), "y");
        assert_eq!(consequence_calls.load(Ordering::SeqCst), 0);
        assert_eq!(alternative_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_true_takes_consequence() {
        let (consequence, calls) = tracked("x");
        let exp = IfElseExp::when(Effect::succeed(true))
            .consequence(consequence)
            .alternative(|| Effect::succeed("y"));

        assert_eq!(exp.run_blocking().unwrap(), "x");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_predicate_builds_neither() {
        let (consequence, a) = tracked("x");
        let (alternative, b) = tracked("y");
        let exp = IfElseExp::when(Effect::fail("cannot decide"))
            .consequence(consequence)
            .alternative(alternative);

        assert!(exp.run_blocking().is_err());
        assert_eq!(a.load(Ordering::SeqCst) + b.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_supplier_panic_is_captured() {
        let exp = IfElseExp::when(Effect::succeed(true))
            .consequence(|| -> Effect<i32> { panic!("supplier exploded") })
            .alternative(|| Effect::succeed(0));

        assert!(exp.run_blocking().unwrap_err().is_panic());
    }

    #[test]
    fn test_debug_each_reports_taken_branch_only() {
        let sink = RecordingSink::new();
        let debugger = Debugger::new(sink.clone());

        IfElseExp::when(Effect::succeed(true))
            .consequence(|| Effect::succeed(1))
            .alternative(|| Effect::succeed(2))
            .debug_each(&debugger)
            .run_blocking()
            .unwrap();

        assert_eq!(
            sink.expressions(),
            vec!["IfElseExp.predicate", "IfElseExp.consequence", "IfElseExp"]
        );
        assert_eq!(sink.events()[2].detail, "1");
    }
}
