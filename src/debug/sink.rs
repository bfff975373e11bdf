//! Destinations for debug events.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Event, Outcome};

/// Accepts debug events.
///
/// Sinks are called on whatever thread observed the outcome, possibly from
/// several threads at once. A panicking sink is logged and ignored.
///
/// Any `Fn(Event)` closure is a sink:
///
/// ```rust
/// use undertow::debug::{Debugger, Event};
///
/// let debugger = Debugger::new(|event: Event| println!("{}", event.expression));
/// ```
pub trait EventSink: Send + Sync {
    /// Consume one event.
    fn record(&self, event: Event);
}

impl<F> EventSink for F
where
    F: Fn(Event) + Send + Sync,
{
    fn record(&self, event: Event) {
        self(event)
    }
}

/// Forwards events to `tracing`.
///
/// Successes are logged at `DEBUG`, failures at `WARN`, both on the
/// `undertow::debug` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: Event) {
        let context = event.context.as_deref().unwrap_or("-");
        match event.outcome {
            Outcome::Success => tracing::debug!(
                target: "undertow::debug",
                sequence = event.sequence,
                expression = %event.expression,
                context,
                thread = %event.thread,
                duration = ?event.duration,
                timestamp = event.timestamp,
                value = %event.detail,
                "effect succeeded"
            ),
            Outcome::Failure => tracing::warn!(
                target: "undertow::debug",
                sequence = event.sequence,
                expression = %event.expression,
                context,
                thread = %event.thread,
                duration = ?event.duration,
                timestamp = event.timestamp,
                error = %event.detail,
                "effect failed"
            ),
        }
    }
}

/// Keeps events in memory.
///
/// Clones share the same buffer, so one clone can be handed to a
/// [`Debugger`](super::Debugger) while another is inspected.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingSink {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Remove and return all recorded events.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Expressions of the recorded events, in recording order.
    pub fn expressions(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.expression.clone()).collect()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl fmt::Debug for RecordingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSink")
            .field("events", &self.len())
            .finish()
    }
}
