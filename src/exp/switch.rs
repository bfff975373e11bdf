//! Branching on the value of a source effect.

use std::fmt;
use std::sync::Arc;

use super::{reported, Exp};
use crate::debug::{Debugger, EventBuilder};
use crate::effect::Effect;

type Matcher<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;
type Branch<I, O> = Arc<dyn Fn(I) -> Effect<O> + Send + Sync>;

/// Runs a source effect and dispatches its value to the first matching case.
///
/// Cases are checked in the order they were added. A case matches by
/// equality ([`SwitchBuilder::case`]), membership
/// ([`SwitchBuilder::case_in`]) or predicate ([`SwitchBuilder::case_when`]).
/// The chosen branch receives the source value.
///
/// ```rust
/// use undertow::exp::{Exp, SwitchExp};
/// use undertow::Effect;
///
/// let exp = SwitchExp::on(Effect::succeed(404))
///     .case(200, |_| Effect::succeed("ok".to_string()))
///     .case_in([301, 302], |_| Effect::succeed("redirect".to_string()))
///     .case_when(|code| *code >= 400, |code| Effect::succeed(format!("error {code}")))
///     .otherwise(|_| Effect::succeed("unknown".to_string()));
///
/// assert_eq!(exp.run_blocking().unwrap(), "error 404");
/// ```
pub struct SwitchExp<I, O> {
    source: Effect<I>,
    cases: Vec<(Matcher<I>, Branch<I, O>)>,
    default: Branch<I, O>,
    report: Option<EventBuilder<O>>,
}

/// A [`SwitchExp`] still missing its default branch.
pub struct SwitchBuilder<I, O> {
    source: Effect<I>,
    cases: Vec<(Matcher<I>, Branch<I, O>)>,
}

impl SwitchExp<(), ()> {
    /// Start a builder switching on the value of `source`.
    pub fn on<I, O>(source: impl Into<Effect<I>>) -> SwitchBuilder<I, O> {
        SwitchBuilder {
            source: source.into(),
            cases: Vec::new(),
        }
    }
}

impl<I, O> SwitchBuilder<I, O> {
    fn push<M, F>(mut self, matcher: M, branch: F) -> Self
    where
        M: Fn(&I) -> bool + Send + Sync + 'static,
        F: Fn(I) -> Effect<O> + Send + Sync + 'static,
    {
        self.cases.push((Arc::new(matcher), Arc::new(branch)));
        self
    }

    /// Match values equal to `value`.
    #[must_use]
    pub fn case<F>(self, value: I, branch: F) -> Self
    where
        I: PartialEq + Send + Sync + 'static,
        F: Fn(I) -> Effect<O> + Send + Sync + 'static,
    {
        self.push(move |candidate| *candidate == value, branch)
    }

    /// Match values equal to any of `values`.
    #[must_use]
    pub fn case_in<V, F>(self, values: V, branch: F) -> Self
    where
        V: IntoIterator<Item = I>,
        I: PartialEq + Send + Sync + 'static,
        F: Fn(I) -> Effect<O> + Send + Sync + 'static,
    {
        let values: Vec<I> = values.into_iter().collect();
        self.push(move |candidate| values.contains(candidate), branch)
    }

    /// Match values accepted by `predicate`.
    #[must_use]
    pub fn case_when<P, F>(self, predicate: P, branch: F) -> Self
    where
        P: Fn(&I) -> bool + Send + Sync + 'static,
        F: Fn(I) -> Effect<O> + Send + Sync + 'static,
    {
        self.push(predicate, branch)
    }

    /// Branch taken when no case matches.
    pub fn otherwise<F>(self, branch: F) -> SwitchExp<I, O>
    where
        F: Fn(I) -> Effect<O> + Send + Sync + 'static,
    {
        SwitchExp {
            source: self.source,
            cases: self.cases,
            default: Arc::new(branch),
            report: None,
        }
    }
}

impl<I, O> SwitchExp<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Emit debug events for the source, the branch taken and the whole
    /// expression.
    #[must_use]
    pub fn debug_each(self, debugger: &Debugger) -> Self
    where
        I: fmt::Debug,
        O: fmt::Debug,
    {
        let cases = self
            .cases
            .into_iter()
            .enumerate()
            .map(|(i, (matcher, branch))| (matcher, decorate(branch, debugger, format!("SwitchExp.case[{i}]"))))
            .collect();
        Self {
            source: self.source.debug(debugger.expression("SwitchExp.source")),
            cases,
            default: decorate(self.default, debugger, "SwitchExp.default".to_string()),
            report: Some(debugger.expression("SwitchExp")),
        }
    }
}

fn decorate<I, O>(branch: Branch<I, O>, debugger: &Debugger, label: String) -> Branch<I, O>
where
    I: 'static,
    O: fmt::Debug + Send + 'static,
{
    let builder = debugger.expression(label);
    Arc::new(move |value| branch(value).debug(builder.clone()))
}

impl<I, O> Exp for SwitchExp<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    type Output = O;

    fn into_effect(self) -> Effect<O> {
        let cases: Arc<[(Matcher<I>, Branch<I, O>)]> = self.cases.into();
        let default = self.default;
        let switched = self.source.and_then(move |value| {
            let branch = cases
                .iter()
                .find(|(matches, _)| matches(&value))
                .map_or(&default, |(_, branch)| branch);
            branch(value)
        });
        reported(switched, self.report)
    }
}

impl<I, O> fmt::Debug for SwitchExp<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchExp")
            .field("source", &self.source)
            .field("cases", &self.cases.len())
            .finish_non_exhaustive()
    }
}

impl<I, O> fmt::Debug for SwitchBuilder<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchBuilder")
            .field("source", &self.source)
            .field("cases", &self.cases.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::RecordingSink;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn classify(code: u16) -> SwitchExp<u16, &'static str> {
        SwitchExp::on(Effect::succeed(code))
            .case(200, |_| Effect::succeed("ok"))
            .case_in([301, 302, 307], |_| Effect::succeed("redirect"))
            .case_when(|c| (400..500).contains(c), |_| Effect::succeed("client error"))
            .case_when(|c| *c >= 400, |_| Effect::succeed("other error"))
            .otherwise(|_| Effect::succeed("unknown"))
    }

    #[rstest]
    #[case(200, "ok")]
    #[case(302, "redirect")]
    #[case(404, "client error")]
    #[case(503, "other error")]
    #[case(100, "unknown")]
    fn test_first_matching_case_wins(#[case] code: u16, #[case] expected: &str) {
        assert_eq!(classify(code).run_blocking().unwrap(), expected);
    }

    #[test]
    fn test_branch_receives_source_value() {
        let exp = SwitchExp::on(Effect::succeed(21))
            .case_when(|n: &i32| n % 2 == 1, |n| Effect::succeed(n * 2))
            .otherwise(Effect::succeed);
        assert_eq!(exp.run_blocking().unwrap(), 42);
    }

    #[test]
    fn test_only_matching_branch_runs() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let exp = SwitchExp::on(Effect::succeed("b"))
            .case("a", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Effect::succeed(1)
            })
            .case("b", |_| Effect::succeed(2))
            .otherwise(|_| Effect::succeed(0));

        assert_eq!(exp.run_blocking().unwrap(), 2);
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failing_source_skips_branches() {
        let exp = SwitchExp::on(Effect::<i32>::fail("no input"))
            .case(1, |_| Effect::succeed("one"))
            .otherwise(|_| Effect::succeed("other"));
        assert_eq!(exp.run_blocking().unwrap_err().to_string(), "no input");
    }

    #[test]
    fn test_debug_each_labels() {
        let sink = RecordingSink::new();
        let debugger = Debugger::new(sink.clone());

        classify(302).debug_each(&debugger).run_blocking().unwrap();

        assert_eq!(
            sink.expressions(),
            vec!["SwitchExp.source", "SwitchExp.case[1]", "SwitchExp"]
        );
        assert_eq!(sink.events()[2].detail, "\"redirect\"");
    }
}
