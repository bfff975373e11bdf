//! Multi-way branching on boolean tests.

use std::fmt;
use std::sync::Arc;

use super::if_else::decorate;
use super::{collect, reported, Exp, Mode};
use crate::debug::{Debugger, EventBuilder};
use crate::effect::Effect;

type Supplier<T> = Arc<dyn Fn() -> Effect<T> + Send + Sync>;

/// Takes the branch of the first clause whose test is `true`.
///
/// Sequentially, tests run in order and stop at the first `true`. In
/// parallel, every test runs concurrently; once all have finished, the first
/// `true` in clause order wins. Only the chosen branch is ever built.
///
/// ```rust
/// use undertow::exp::{CondExp, Exp};
/// use undertow::Effect;
///
/// let temperature = 31;
/// let exp = CondExp::seq()
///     .clause(Effect::succeed(temperature < 10), || Effect::succeed("cold"))
///     .clause(Effect::succeed(temperature > 30), || Effect::succeed("hot"))
///     .otherwise(|| Effect::succeed("mild"));
///
/// assert_eq!(exp.run_blocking().unwrap(), "hot");
/// ```
pub struct CondExp<T> {
    mode: Mode,
    clauses: Vec<(Effect<bool>, Supplier<T>)>,
    default: Supplier<T>,
    report: Option<EventBuilder<T>>,
}

/// A [`CondExp`] still missing its default branch.
pub struct CondBuilder<T> {
    mode: Mode,
    clauses: Vec<(Effect<bool>, Supplier<T>)>,
}

impl CondExp<()> {
    /// Start a builder that tests clauses one by one.
    pub fn seq<T>() -> CondBuilder<T> {
        Self::with_mode(Mode::Sequential)
    }

    /// Start a builder that runs every test concurrently.
    pub fn par<T>() -> CondBuilder<T> {
        Self::with_mode(Mode::Parallel)
    }

    /// Start a builder with an explicit mode.
    pub fn with_mode<T>(mode: Mode) -> CondBuilder<T> {
        CondBuilder {
            mode,
            clauses: Vec::new(),
        }
    }
}

impl<T> CondBuilder<T> {
    /// Add a clause: when `test` yields `true`, run what `branch` builds.
    #[must_use]
    pub fn clause<F>(mut self, test: impl Into<Effect<bool>>, branch: F) -> Self
    where
        F: Fn() -> Effect<T> + Send + Sync + 'static,
    {
        self.clauses.push((test.into(), Arc::new(branch)));
        self
    }

    /// Branch taken when no test is `true`.
    pub fn otherwise<F>(self, branch: F) -> CondExp<T>
    where
        F: Fn() -> Effect<T> + Send + Sync + 'static,
    {
        CondExp {
            mode: self.mode,
            clauses: self.clauses,
            default: Arc::new(branch),
            report: None,
        }
    }
}

impl<T: Send + 'static> CondExp<T> {
    /// Emit debug events for every test that runs, the branch taken and the
    /// whole expression.
    #[must_use]
    pub fn debug_each(self, debugger: &Debugger) -> Self
    where
        T: fmt::Debug,
    {
        let clauses = self
            .clauses
            .into_iter()
            .enumerate()
            .map(|(i, (test, branch))| {
                (
                    test.debug(debugger.expression(format!("CondExp.test[{i}]"))),
                    decorate(branch, debugger, &format!("CondExp.branch[{i}]")),
                )
            })
            .collect();
        Self {
            mode: self.mode,
            clauses,
            default: decorate(self.default, debugger, "CondExp.default"),
            report: Some(debugger.expression("CondExp")),
        }
    }
}

impl<T: Send + 'static> Exp for CondExp<T> {
    type Output = T;

    fn into_effect(self) -> Effect<T> {
        let mode = self.mode;
        let (tests, branches): (Vec<_>, Vec<_>) = self.clauses.into_iter().unzip();
        let tests: Arc<[Effect<bool>]> = tests.into();
        let branches: Arc<[Supplier<T>]> = branches.into();
        let default = self.default;

        let cond = Effect::composed(move || {
            let tests = tests.clone();
            let branches = branches.clone();
            let default = default.clone();
            async move {
                let chosen = match mode {
                    Mode::Sequential => {
                        let mut chosen = None;
                        for (i, test) in tests.iter().enumerate() {
                            if test.run().await? {
                                chosen = Some(i);
                                break;
                            }
                        }
                        chosen
                    }
                    Mode::Parallel => collect(&tests, mode).await?.into_iter().position(|hit| hit),
                };
                let branch = match chosen {
                    Some(i) => branches[i](),
                    None => default(),
                };
                branch.run().await
            }
        });
        reported(cond, self.report)
    }
}

impl<T> fmt::Debug for CondExp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CondExp")
            .field("mode", &self.mode)
            .field("clauses", &self.clauses.len())
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Debug for CondBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CondBuilder")
            .field("mode", &self.mode)
            .field("clauses", &self.clauses.len())
            .finish()
    }
}
