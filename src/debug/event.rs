//! Event records emitted by debug decorations.

use std::time::Duration;

use serde::Serialize;

/// How a decorated evaluation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The effect produced a value.
    Success,
    /// The effect failed.
    Failure,
}

/// One decorated evaluation.
///
/// Events are write-only records: the runtime builds them and hands them to
/// an [`EventSink`](super::EventSink), and nothing reads them back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Per-debugger counter, increasing in emission order.
    pub sequence: u64,
    /// Description of the decorated expression.
    pub expression: String,
    /// Success or failure.
    pub outcome: Outcome,
    /// The formatted value or error.
    pub detail: String,
    /// Time between start and end of the evaluation.
    pub duration: Duration,
    /// Correlation tag of the debugger, if any.
    pub context: Option<String>,
    /// Thread that observed the outcome.
    pub thread: String,
    /// Completion time, in the unit of the debugger's timestamp clock.
    pub timestamp: i64,
}

impl Event {
    /// Returns true if the evaluation succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Render the event as a single JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sequence": self.sequence,
            "expression": self.expression,
            "outcome": self.outcome,
            "detail": self.detail,
            "duration_ns": u64::try_from(self.duration.as_nanos()).unwrap_or(u64::MAX),
            "context": self.context,
            "thread": self.thread,
            "timestamp": self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Event {
        Event {
            sequence: 3,
            expression: "load user".to_string(),
            outcome: Outcome::Failure,
            detail: "not found".to_string(),
            duration: Duration::from_micros(1500),
            context: Some("req-7".to_string()),
            thread: "main".to_string(),
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_is_success() {
        let mut event = sample();
        assert!(!event.is_success());
        event.outcome = Outcome::Success;
        assert!(event.is_success());
    }

    #[test]
    fn test_to_json_fields() {
        let json = sample().to_json();
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["duration_ns"], 1_500_000);
        assert_eq!(json["context"], "req-7");
        assert_eq!(json["sequence"], 3);
    }
}
