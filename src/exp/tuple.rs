//! Fixed-arity heterogeneous combinators.

use std::fmt;

use super::{reported, Exp, Mode};
use crate::debug::{Debugger, EventBuilder};
use crate::effect::Effect;

/// Runs two effects of independent types and pairs their values.
///
/// ```rust
/// use undertow::exp::{Exp, PairExp};
/// use undertow::Effect;
///
/// let pair = PairExp::par(Effect::succeed("user"), Effect::succeed(3u8));
/// assert_eq!(pair.run_blocking().unwrap(), ("user", 3));
/// ```
pub struct PairExp<A, B> {
    mode: Mode,
    first: Effect<A>,
    second: Effect<B>,
    report: Option<EventBuilder<(A, B)>>,
}

impl<A, B> PairExp<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    /// Run `first`, then `second`.
    pub fn seq(first: impl Into<Effect<A>>, second: impl Into<Effect<B>>) -> Self {
        Self::with_mode(Mode::Sequential, first, second)
    }

    /// Run both concurrently.
    pub fn par(first: impl Into<Effect<A>>, second: impl Into<Effect<B>>) -> Self {
        Self::with_mode(Mode::Parallel, first, second)
    }

    /// Build with an explicit mode.
    pub fn with_mode(mode: Mode, first: impl Into<Effect<A>>, second: impl Into<Effect<B>>) -> Self {
        Self {
            mode,
            first: first.into(),
            second: second.into(),
            report: None,
        }
    }

    /// Emit a debug event for the pair and for both branches.
    #[must_use]
    pub fn debug_each(self, debugger: &Debugger) -> Self
    where
        A: fmt::Debug,
        B: fmt::Debug,
    {
        Self {
            mode: self.mode,
            first: self.first.debug(debugger.expression("PairExp.first")),
            second: self.second.debug(debugger.expression("PairExp.second")),
            report: Some(debugger.expression("PairExp")),
        }
    }
}

impl<A, B> Exp for PairExp<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    type Output = (A, B);

    fn into_effect(self) -> Effect<(A, B)> {
        let Self {
            mode,
            first,
            second,
            report,
        } = self;
        let pair = Effect::composed(move || {
            let (first, second) = (first.clone(), second.clone());
            async move {
                match mode {
                    Mode::Sequential => Ok((first.run().await?, second.run().await?)),
                    Mode::Parallel => {
                        let (a, b) = futures::join!(first.start(), second.start());
                        Ok((a?, b?))
                    }
                }
            }
        });
        reported(pair, report)
    }
}

impl<A, B> fmt::Debug for PairExp<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairExp")
            .field("mode", &self.mode)
            .field("first", &self.first)
            .field("second", &self.second)
            .finish()
    }
}

/// Runs three effects of independent types and collects a triple.
pub struct TripleExp<A, B, C> {
    mode: Mode,
    first: Effect<A>,
    second: Effect<B>,
    third: Effect<C>,
    report: Option<EventBuilder<(A, B, C)>>,
}

impl<A, B, C> TripleExp<A, B, C>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    /// Run the three effects in order.
    pub fn seq(
        first: impl Into<Effect<A>>,
        second: impl Into<Effect<B>>,
        third: impl Into<Effect<C>>,
    ) -> Self {
        Self::with_mode(Mode::Sequential, first, second, third)
    }

    /// Run the three effects concurrently.
    pub fn par(
        first: impl Into<Effect<A>>,
        second: impl Into<Effect<B>>,
        third: impl Into<Effect<C>>,
    ) -> Self {
        Self::with_mode(Mode::Parallel, first, second, third)
    }

    /// Build with an explicit mode.
    pub fn with_mode(
        mode: Mode,
        first: impl Into<Effect<A>>,
        second: impl Into<Effect<B>>,
        third: impl Into<Effect<C>>,
    ) -> Self {
        Self {
            mode,
            first: first.into(),
            second: second.into(),
            third: third.into(),
            report: None,
        }
    }

    /// Emit a debug event for the triple and for every branch.
    #[must_use]
    pub fn debug_each(self, debugger: &Debugger) -> Self
    where
        A: fmt::Debug,
        B: fmt::Debug,
        C: fmt::Debug,
    {
        Self {
            mode: self.mode,
            first: self.first.debug(debugger.expression("TripleExp.first")),
            second: self.second.debug(debugger.expression("TripleExp.second")),
            third: self.third.debug(debugger.expression("TripleExp.third")),
            report: Some(debugger.expression("TripleExp")),
        }
    }
}

impl<A, B, C> Exp for TripleExp<A, B, C>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    type Output = (A, B, C);

    fn into_effect(self) -> Effect<(A, B, C)> {
        let Self {
            mode,
            first,
            second,
            third,
            report,
        } = self;
        let triple = Effect::composed(move || {
            let (first, second, third) = (first.clone(), second.clone(), third.clone());
            async move {
                match mode {
                    Mode::Sequential => {
                        let a = first.run().await?;
                        let b = second.run().await?;
                        let c = third.run().await?;
                        Ok((a, b, c))
                    }
                    Mode::Parallel => {
                        let (a, b, c) = futures::join!(first.start(), second.start(), third.start());
                        Ok((a?, b?, c?))
                    }
                }
            }
        });
        reported(triple, report)
    }
}

impl<A, B, C> fmt::Debug for TripleExp<A, B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripleExp")
            .field("mode", &self.mode)
            .field("first", &self.first)
            .field("second", &self.second)
            .field("third", &self.third)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::RecordingSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn after(secs: u64, value: &'static str) -> Effect<&'static str> {
        Effect::sleep(Duration::from_secs(secs)).map(move |_| value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_pair_par_overlaps() {
        let start = Instant::now();
        let pair = PairExp::par(after(1, "a"), after(1, "b")).into_effect();

        assert_eq!(pair.run().await.unwrap(), ("a", "b"));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pair_seq_adds_up() {
        let start = Instant::now();
        let pair = PairExp::seq(after(1, "a"), after(1, "b")).into_effect();

        assert_eq!(pair.run().await.unwrap(), ("a", "b"));
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_pair_par_reports_first_failure_by_position() {
        let pair = PairExp::<i32, i32>::par(Effect::fail("first"), Effect::fail("second"));
        assert_eq!(pair.into_effect().run().await.unwrap_err().to_string(), "first");
    }

    #[tokio::test]
    async fn test_pair_seq_skips_second_after_failure() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();
        let pair = PairExp::seq(
            Effect::<i32>::fail("first"),
            Effect::lazy(move || counter.fetch_add(1, Ordering::SeqCst)),
        );

        assert!(pair.into_effect().run().await.is_err());
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pair_par_still_runs_second_after_failure() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();
        let pair = PairExp::par(
            Effect::<i32>::fail("first"),
            Effect::lazy(move || counter.fetch_add(1, Ordering::SeqCst)),
        );

        assert!(pair.into_effect().run().await.is_err());
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_triple_par_mixed_types() {
        let start = Instant::now();
        let triple = TripleExp::par(
            Effect::sleep(Duration::from_secs(1)).map(|_| 1u8),
            Effect::sleep(Duration::from_secs(1)).map(|_| "two"),
            Effect::sleep(Duration::from_secs(1)).map(|_| 3.0f64),
        );

        assert_eq!(triple.into_effect().run().await.unwrap(), (1, "two", 3.0));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_triple_seq_blocking() {
        let triple = TripleExp::seq(Effect::succeed(1), Effect::succeed('b'), Effect::succeed("c"));
        assert_eq!(triple.join_blocking(), (1, 'b', "c"));
    }

    #[test]
    fn test_nested_pair() {
        let inner = PairExp::seq(Effect::succeed(1), Effect::succeed(2));
        let outer = PairExp::par(inner, Effect::succeed(3));
        assert_eq!(outer.run_blocking().unwrap(), ((1, 2), 3));
    }

    #[test]
    fn test_debug_each_names_positions() {
        let sink = RecordingSink::new();
        let debugger = Debugger::new(sink.clone());

        TripleExp::seq(Effect::succeed(1), Effect::succeed(2), Effect::succeed(3))
            .debug_each(&debugger)
            .run_blocking()
            .unwrap();

        assert_eq!(
            sink.expressions(),
            vec!["TripleExp.first", "TripleExp.second", "TripleExp.third", "TripleExp"]
        );
        assert_eq!(sink.events()[3].detail, "(1, 2, 3)");
    }

    #[test]
    fn test_pair_debug_each_reports_pair_after_branches() {
        let sink = RecordingSink::new();
        let debugger = Debugger::new(sink.clone());

        PairExp::par(Effect::succeed("id"), Effect::succeed(7))
            .debug_each(&debugger)
            .run_blocking()
            .unwrap();

        let mut branches = sink.expressions();
        let whole = branches.pop().unwrap();
        branches.sort();
        assert_eq!(whole, "PairExp");
        assert_eq!(branches, vec!["PairExp.first", "PairExp.second"]);
        assert_eq!(sink.events()[2].detail, "(\"id\", 7)");
    }
}
