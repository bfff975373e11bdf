//! Progress of a retry sequence.

use std::time::Duration;

/// Where a retry sequence currently stands.
///
/// A policy is consulted with the status *before* the retry it is deciding
/// on: the first consultation sees `counter == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct RetryStatus {
    /// Number of retries granted so far.
    pub counter: u32,
    /// Sum of all delays granted so far.
    pub cumulative_delay: Duration,
    /// The delay granted for the previous retry, if any.
    pub previous_delay: Option<Duration>,
}

impl RetryStatus {
    /// Status of a sequence that has not retried yet.
    pub fn start() -> Self {
        Self::default()
    }

    /// Advance after a retry was granted with `delay`.
    ///
    /// ```
    /// use std::time::Duration;
    /// use undertow::RetryStatus;
    ///
    /// let status = RetryStatus::start()
    ///     .next(Duration::from_millis(100))
    ///     .next(Duration::from_millis(200));
    ///
    /// assert_eq!(status.counter, 2);
    /// assert_eq!(status.cumulative_delay, Duration::from_millis(300));
    /// assert_eq!(status.previous_delay, Some(Duration::from_millis(200)));
    /// ```
    #[must_use]
    pub fn next(self, delay: Duration) -> Self {
        Self {
            counter: self.counter.saturating_add(1),
            cumulative_delay: self.cumulative_delay.saturating_add(delay),
            previous_delay: Some(delay),
        }
    }
}
