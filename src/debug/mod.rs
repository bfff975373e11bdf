//! Debug decoration: event emission around effect evaluations.
//!
//! A [`Debugger`] bundles everything needed to report on an evaluation: an
//! [`EventSink`], an optional context tag for correlation, a clock for
//! timestamps and a clock for measuring durations. Decorating an effect with
//! [`Effect::debug`] emits one [`Event`] per run and never changes the
//! outcome:
//!
//! ```rust
//! use undertow::debug::{Debugger, RecordingSink};
//! use undertow::Effect;
//!
//! let sink = RecordingSink::new();
//! let debugger = Debugger::new(sink.clone()).with_context("request-42");
//!
//! let effect = Effect::succeed(2)
//!     .map(|x| x * 21)
//!     .debug(debugger.expression("answer"));
//!
//! assert_eq!(effect.run_blocking().unwrap(), 42);
//!
//! let events = sink.events();
//! assert_eq!(events[0].expression, "answer");
//! assert_eq!(events[0].detail, "42");
//! assert_eq!(events[0].context.as_deref(), Some("request-42"));
//! ```
//!
//! Combinators offer `debug_each`, which reports on the whole expression and
//! on every branch it contains.

mod event;
mod sink;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::effect::Effect;
use crate::error::{Error, Result};

pub use event::{Event, Outcome};
pub use sink::{EventSink, RecordingSink, TracingSink};

type Formatter<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Source of [`EventBuilder`]s sharing one sink, context and clock pair.
///
/// Cloning is cheap. Clones share the sink and the sequence counter.
#[derive(Clone)]
pub struct Debugger {
    sink: Arc<dyn EventSink>,
    context: Option<Arc<str>>,
    timestamps: Clock,
    ticker: Clock,
    sequence: Arc<AtomicU64>,
}

impl Debugger {
    /// A debugger writing to `sink`.
    ///
    /// Timestamps come from [`Clock::real_time`] and durations from
    /// [`Clock::monotonic`].
    pub fn new<S>(sink: S) -> Self
    where
        S: EventSink + 'static,
    {
        Self {
            sink: Arc::new(sink),
            context: None,
            timestamps: Clock::real_time(),
            ticker: Clock::monotonic(),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A debugger that logs through `tracing`.
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    /// Tag every event with `context`.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(Arc::from(context.into()));
        self
    }

    /// Clock used for event timestamps.
    #[must_use]
    pub fn with_timestamp_clock(mut self, clock: Clock) -> Self {
        self.timestamps = clock;
        self
    }

    /// Clock used to measure durations. Ticks are read as nanoseconds.
    #[must_use]
    pub fn with_ticker(mut self, clock: Clock) -> Self {
        self.ticker = clock;
        self
    }

    /// The context tag, if any.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Describe an expression whose values print with `Debug`.
    pub fn expression<T>(&self, expression: impl Into<String>) -> EventBuilder<T>
    where
        T: fmt::Debug,
    {
        self.expression_with(expression, |value: &T| format!("{value:?}"))
    }

    /// Describe an expression whose values print with `format_value`.
    pub fn expression_with<T, F>(&self, expression: impl Into<String>, format_value: F) -> EventBuilder<T>
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        EventBuilder {
            debugger: self.clone(),
            expression: expression.into(),
            format_value: Arc::new(format_value),
            format_error: Arc::new(|error: &Error| error.to_string()),
        }
    }

    fn emit(&self, expression: &str, outcome: Outcome, detail: String, started: i64) {
        let elapsed = self.ticker.now().saturating_sub(started).max(0);
        let thread = std::thread::current();
        let event = Event {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            expression: expression.to_string(),
            outcome,
            detail,
            duration: Duration::from_nanos(elapsed.unsigned_abs()),
            context: self.context.as_deref().map(str::to_owned),
            thread: thread
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("{:?}", thread.id())),
            timestamp: self.timestamps.now(),
        };
        if let Err(panic) = crate::effect::catch(|| self.sink.record(event)) {
            tracing::warn!(expression, error = %panic, "event sink panicked; event dropped");
        }
    }
}

impl fmt::Debug for Debugger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debugger")
            .field("context", &self.context)
            .field("timestamps", &self.timestamps)
            .field("ticker", &self.ticker)
            .finish_non_exhaustive()
    }
}

/// Describes how one expression is reported.
///
/// Obtained from [`Debugger::expression`]; consumed by [`Effect::debug`].
pub struct EventBuilder<T> {
    debugger: Debugger,
    expression: String,
    format_value: Formatter<T>,
    format_error: Formatter<Error>,
}

impl<T> Clone for EventBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            debugger: self.debugger.clone(),
            expression: self.expression.clone(),
            format_value: self.format_value.clone(),
            format_error: self.format_error.clone(),
        }
    }
}

impl<T> EventBuilder<T> {
    /// Replace the value formatter.
    #[must_use]
    pub fn format_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.format_value = Arc::new(f);
        self
    }

    /// Replace the error formatter.
    #[must_use]
    pub fn format_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&Error) -> String + Send + Sync + 'static,
    {
        self.format_error = Arc::new(f);
        self
    }

    /// The expression description.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn start(&self) -> i64 {
        self.debugger.ticker.now()
    }

    fn finish(&self, result: &Result<T>, started: i64) {
        let (outcome, detail) = match result {
            Ok(value) => (Outcome::Success, render(|| (self.format_value)(value))),
            Err(error) => (Outcome::Failure, render(|| (self.format_error)(error))),
        };
        self.debugger.emit(&self.expression, outcome, detail, started);
    }
}

impl<T> fmt::Debug for EventBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBuilder")
            .field("expression", &self.expression)
            .field("debugger", &self.debugger)
            .finish_non_exhaustive()
    }
}

fn render(format: impl FnOnce() -> String) -> String {
    crate::effect::catch(format).unwrap_or_else(|panic| format!("<formatter panicked: {panic}>"))
}

impl<T: Send + 'static> Effect<T> {
    /// Emit an event for every run of this effect.
    ///
    /// The outcome is returned unchanged; neither a failing formatter nor a
    /// panicking sink can alter it.
    pub fn debug(self, builder: EventBuilder<T>) -> Self {
        if self.is_ready() {
            return Effect::defer(move || {
                let started = builder.start();
                let result = self.run_blocking();
                builder.finish(&result, started);
                result
            });
        }
        let builder = Arc::new(builder);
        Effect::composed(move || {
            let builder = builder.clone();
            let started = builder.start();
            let run = self.run();
            async move {
                let result = run.await;
                builder.finish(&result, started);
                result
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI64;

    fn stepping_clock(step: i64) -> Clock {
        let ticks = Arc::new(AtomicI64::new(0));
        Clock::custom(move || ticks.fetch_add(step, Ordering::SeqCst))
    }

    fn recording() -> (Debugger, RecordingSink) {
        let sink = RecordingSink::new();
        let debugger = Debugger::new(sink.clone())
            .with_ticker(stepping_clock(1_000))
            .with_timestamp_clock(Clock::custom(|| 99));
        (debugger, sink)
    }

    #[test]
    fn test_debug_records_success() {
        let (debugger, sink) = recording();
        let effect = Effect::succeed(vec![1, 2]).debug(debugger.expression("numbers"));

        assert_eq!(effect.run_blocking().unwrap(), vec![1, 2]);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, Outcome::Success);
        assert_eq!(events[0].detail, "[1, 2]");
        assert_eq!(events[0].duration, Duration::from_micros(1));
        assert_eq!(events[0].timestamp, 99);
        assert_eq!(events[0].context, None);
    }

    #[tokio::test]
    async fn test_debug_records_failure_without_changing_it() {
        let (debugger, sink) = recording();
        let effect = Effect::<i32>::from_async(|| async { Err(Error::msg("denied")) })
            .debug(debugger.with_context("ctx").expression("auth"));

        assert_eq!(effect.run().await.unwrap_err().to_string(), "denied");

        let event = &sink.events()[0];
        assert_eq!(event.outcome, Outcome::Failure);
        assert_eq!(event.detail, "denied");
        assert_eq!(event.context.as_deref(), Some("ctx"));
    }

    #[test]
    fn test_custom_formatters() {
        let (debugger, sink) = recording();
        let builder = debugger
            .expression_with("secret", |_: &String| "<redacted>".to_string())
            .format_error(|e| format!("E: {e}"));

        Effect::succeed("hunter2".to_string()).debug(builder.clone()).run_blocking().unwrap();
        let _ = Effect::<String>::fail("bad").debug(builder).run_blocking();

        let details: Vec<_> = sink.events().into_iter().map(|e| e.detail).collect();
        assert_eq!(details, vec!["<redacted>", "E: bad"]);
    }

    #[test]
    fn test_sequence_increases_per_debugger() {
        let (debugger, sink) = recording();
        let effect = Effect::succeed(1).debug(debugger.expression("x"));

        effect.run_blocking().unwrap();
        effect.run_blocking().unwrap();

        let sequences: Vec<_> = sink.events().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
    }

    #[test]
    fn test_panicking_sink_does_not_change_outcome() {
        let debugger = Debugger::new(|_: Event| panic!("sink down"));
        let effect = Effect::succeed(5).debug(debugger.expression("five"));
        assert_eq!(effect.run_blocking().unwrap(), 5);
    }

    #[test]
    fn test_panicking_formatter_is_reported_in_detail() {
        let (debugger, sink) = recording();
        let builder = debugger.expression_with("odd", |_: &i32| -> String { panic!("cannot format") });

        Effect::succeed(1).debug(builder).run_blocking().unwrap();

        assert!(sink.events()[0].detail.starts_with("<formatter panicked"));
    }

    #[test]
    fn test_debug_keeps_ready_effects_ready() {
        let (debugger, _) = recording();
        assert!(Effect::succeed(1).debug(debugger.expression("x")).is_ready());
    }

    #[tokio::test]
    async fn test_duration_excludes_time_before_first_poll() {
        let sink = RecordingSink::new();
        let ticker = crate::testing::StubClock::starting_at(0);
        let debugger = Debugger::new(sink.clone()).with_ticker(ticker.clock());
        let effect = Effect::from_async(|| async { Ok(1) }).debug(debugger.expression("queued"));

        let pending = effect.run();
        ticker.advance(5_000);
        assert_eq!(pending.await.unwrap(), 1);

        assert_eq!(sink.events()[0].duration, Duration::ZERO);
    }
}
