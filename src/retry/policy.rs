//! Retry policy values and their algebra.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::RetryStatus;

type DelayFn = Arc<dyn Fn(&RetryStatus) -> Option<Duration> + Send + Sync>;

/// Decides whether another attempt should happen, and after what delay.
///
/// Policies are pure data: consulting one never changes it, so a single
/// policy can be shared by any number of concurrently retrying effects.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use undertow::{RetryPolicy, RetryStatus};
///
/// // Wait 100ms, 200ms, 300ms, ... but give up after three retries.
/// let policy = RetryPolicy::incremental_delay(Duration::from_millis(100))
///     .append(RetryPolicy::limit_retries(3));
///
/// let delays: Vec<_> = policy.simulate(5).into_iter().map(|(_, d)| d).collect();
/// assert_eq!(
///     delays,
///     vec![
///         Some(Duration::from_millis(100)),
///         Some(Duration::from_millis(200)),
///         Some(Duration::from_millis(300)),
///         None,
///     ]
/// );
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    rule: Arc<Rule>,
}

enum Rule {
    LimitRetries(u32),
    Constant(Duration),
    Incremental(Duration),
    Exponential(Duration),
    Fibonacci(Duration),
    Append(RetryPolicy, RetryPolicy),
    FollowedBy(RetryPolicy, RetryPolicy),
    CapDelay(RetryPolicy, Duration),
    LimitByDelay(RetryPolicy, Duration),
    LimitByCumulativeDelay(RetryPolicy, Duration),
    #[cfg_attr(not(feature = "jitter"), allow(dead_code))]
    Jitter(RetryPolicy, JitterStrategy),
    Custom(DelayFn),
}

/// Strategy for adding randomness to delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterStrategy {
    /// Uniform between zero and the computed delay.
    Full,
    /// Half the computed delay, plus a uniform share of the other half.
    Equal,
    /// Uniform between the computed delay and three times the previous one.
    Decorrelated,
}

impl RetryPolicy {
    fn from_rule(rule: Rule) -> Self {
        Self {
            rule: Arc::new(rule),
        }
    }

    /// Retry immediately, at most `n` times.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use undertow::{RetryPolicy, RetryStatus};
    ///
    /// let policy = RetryPolicy::limit_retries(1);
    /// let first = RetryStatus::start();
    ///
    /// assert_eq!(policy.delay(&first), Some(Duration::ZERO));
    /// assert_eq!(policy.delay(&first.next(Duration::ZERO)), None);
    /// ```
    pub fn limit_retries(n: u32) -> Self {
        Self::from_rule(Rule::LimitRetries(n))
    }

    /// Never retry.
    pub fn never() -> Self {
        Self::limit_retries(0)
    }

    /// Wait `delay` before every retry, forever.
    pub fn constant_delay(delay: Duration) -> Self {
        Self::from_rule(Rule::Constant(delay))
    }

    /// Wait `base * (retries so far + 1)`, forever.
    pub fn incremental_delay(base: Duration) -> Self {
        Self::from_rule(Rule::Incremental(base))
    }

    /// Wait `base * 2^(retries so far)`, forever.
    pub fn exponential_backoff(base: Duration) -> Self {
        Self::from_rule(Rule::Exponential(base))
    }

    /// Wait `base * fib(retries so far + 1)`, forever.
    ///
    /// Delays go `base, base, 2*base, 3*base, 5*base, ...`.
    pub fn fibonacci(base: Duration) -> Self {
        Self::from_rule(Rule::Fibonacci(base))
    }

    /// Wrap an arbitrary delay function.
    ///
    /// The function must be pure: it is consulted once per failed attempt and
    /// may be shared between threads.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RetryStatus) -> Option<Duration> + Send + Sync + 'static,
    {
        Self::from_rule(Rule::Custom(Arc::new(f)))
    }

    /// Combine two policies so both must agree to retry.
    ///
    /// If either policy stops, the composite stops. Otherwise the larger of
    /// the two delays is used. This is how a delay schedule and a limit are
    /// layered on top of each other, in either order:
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use undertow::RetryPolicy;
    ///
    /// let policy = RetryPolicy::exponential_backoff(Duration::from_millis(10))
    ///     .append(RetryPolicy::limit_retries(2));
    ///
    /// assert_eq!(policy.simulate(10).len(), 3); // two retries, then stop
    /// ```
    ///
    /// `append` is associative.
    #[must_use]
    pub fn append(self, other: RetryPolicy) -> Self {
        Self::from_rule(Rule::Append(self, other))
    }

    /// Use this policy until it stops, then fall over to `other`.
    ///
    /// Both policies see the same status, so `other` observes the retries
    /// already granted by `self`.
    #[must_use]
    pub fn followed_by(self, other: RetryPolicy) -> Self {
        Self::from_rule(Rule::FollowedBy(self, other))
    }

    /// Clamp every delay to at most `max`.
    #[must_use]
    pub fn cap_delay(self, max: Duration) -> Self {
        Self::from_rule(Rule::CapDelay(self, max))
    }

    /// Stop as soon as a single delay would reach `max`.
    #[must_use]
    pub fn limit_retries_by_delay(self, max: Duration) -> Self {
        Self::from_rule(Rule::LimitByDelay(self, max))
    }

    /// Stop once the total time spent waiting would exceed `max`.
    #[must_use]
    pub fn limit_retries_by_cumulative_delay(self, max: Duration) -> Self {
        Self::from_rule(Rule::LimitByCumulativeDelay(self, max))
    }

    /// Randomize each delay uniformly between zero and its computed value.
    #[cfg(feature = "jitter")]
    #[must_use]
    pub fn full_jitter(self) -> Self {
        Self::from_rule(Rule::Jitter(self, JitterStrategy::Full))
    }

    /// Keep half of each delay and randomize the other half.
    #[cfg(feature = "jitter")]
    #[must_use]
    pub fn equal_jitter(self) -> Self {
        Self::from_rule(Rule::Jitter(self, JitterStrategy::Equal))
    }

    /// Randomize each delay between its computed value and three times the
    /// previous delay.
    #[cfg(feature = "jitter")]
    #[must_use]
    pub fn decorrelated_jitter(self) -> Self {
        Self::from_rule(Rule::Jitter(self, JitterStrategy::Decorrelated))
    }

    /// Consult the policy.
    ///
    /// Returns the delay to wait before the next attempt, or `None` to stop.
    pub fn delay(&self, status: &RetryStatus) -> Option<Duration> {
        match &*self.rule {
            Rule::LimitRetries(n) => (status.counter < *n).then_some(Duration::ZERO),
            Rule::Constant(delay) => Some(*delay),
            Rule::Incremental(base) => Some(base.saturating_mul(status.counter.saturating_add(1))),
            Rule::Exponential(base) => {
                Some(base.saturating_mul(2u32.saturating_pow(status.counter)))
            }
            Rule::Fibonacci(base) => {
                Some(base.saturating_mul(fibonacci(status.counter.saturating_add(1))))
            }
            Rule::Append(left, right) => {
                let a = left.delay(status)?;
                let b = right.delay(status)?;
                Some(a.max(b))
            }
            Rule::FollowedBy(first, second) => {
                first.delay(status).or_else(|| second.delay(status))
            }
            Rule::CapDelay(inner, max) => inner.delay(status).map(|d| d.min(*max)),
            Rule::LimitByDelay(inner, max) => inner.delay(status).filter(|d| d < max),
            Rule::LimitByCumulativeDelay(inner, max) => inner
                .delay(status)
                .filter(|d| status.cumulative_delay.saturating_add(*d) <= *max),
            Rule::Jitter(inner, strategy) => inner
                .delay(status)
                .map(|d| strategy.apply(d, status.previous_delay)),
            Rule::Custom(f) => f(status),
        }
    }

    /// Replay the policy against `failures` consecutive failures.
    ///
    /// Returns the status seen at each consultation together with the
    /// decision. The list ends early at the first `None`.
    pub fn simulate(&self, failures: u32) -> Vec<(RetryStatus, Option<Duration>)> {
        let mut status = RetryStatus::start();
        let mut decisions = Vec::new();
        for _ in 0..failures {
            let delay = self.delay(&status);
            decisions.push((status, delay));
            match delay {
                Some(delay) => status = status.next(delay),
                None => break,
            }
        }
        decisions
    }
}

impl Default for RetryPolicy {
    /// 50ms between attempts, at most five retries.
    fn default() -> Self {
        RetryPolicy::constant_delay(Duration::from_millis(50)).append(RetryPolicy::limit_retries(5))
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.rule {
            Rule::LimitRetries(n) => f.debug_tuple("LimitRetries").field(n).finish(),
            Rule::Constant(d) => f.debug_tuple("Constant").field(d).finish(),
            Rule::Incremental(d) => f.debug_tuple("Incremental").field(d).finish(),
            Rule::Exponential(d) => f.debug_tuple("Exponential").field(d).finish(),
            Rule::Fibonacci(d) => f.debug_tuple("Fibonacci").field(d).finish(),
            Rule::Append(a, b) => f.debug_tuple("Append").field(a).field(b).finish(),
            Rule::FollowedBy(a, b) => f.debug_tuple("FollowedBy").field(a).field(b).finish(),
            Rule::CapDelay(p, d) => f.debug_tuple("CapDelay").field(p).field(d).finish(),
            Rule::LimitByDelay(p, d) => f.debug_tuple("LimitByDelay").field(p).field(d).finish(),
            Rule::LimitByCumulativeDelay(p, d) => f
                .debug_tuple("LimitByCumulativeDelay")
                .field(p)
                .field(d)
                .finish(),
            Rule::Jitter(p, s) => f.debug_tuple("Jitter").field(p).field(s).finish(),
            Rule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl JitterStrategy {
    #[cfg(feature = "jitter")]
    fn apply(self, delay: Duration, previous: Option<Duration>) -> Duration {
        use rand::Rng;

        let mut rng = rand::rng();
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let jittered = match self {
            JitterStrategy::Full => rng.random_range(0..=millis),
            JitterStrategy::Equal => {
                let half = millis / 2;
                half + rng.random_range(0..=millis - half)
            }
            JitterStrategy::Decorrelated => {
                let previous = previous.unwrap_or(delay);
                let upper = u64::try_from(previous.as_millis().saturating_mul(3)).unwrap_or(u64::MAX);
                if upper <= millis {
                    millis
                } else {
                    rng.random_range(millis..=upper)
                }
            }
        };
        Duration::from_millis(jittered)
    }

    #[cfg(not(feature = "jitter"))]
    fn apply(self, delay: Duration, _previous: Option<Duration>) -> Duration {
        delay
    }
}

/// The nth Fibonacci number, saturating at `u32::MAX`.
fn fibonacci(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let (mut a, mut b) = (0u32, 1u32);
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    b
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn delays(policy: &RetryPolicy, failures: u32) -> Vec<Option<Duration>> {
        policy.simulate(failures).into_iter().map(|(_, d)| d).collect()
    }

    #[test]
    fn test_fibonacci_sequence() {
        let values: Vec<u32> = (0..8).map(fibonacci).collect();
        assert_eq!(values, vec![0, 1, 1, 2, 3, 5, 8, 13]);
    }

    #[test]
    fn test_fibonacci_saturates() {
        assert_eq!(fibonacci(200), u32::MAX);
    }

    #[test]
    fn test_debug_shows_structure() {
        let policy = RetryPolicy::constant_delay(ms(5)).append(RetryPolicy::limit_retries(2));
        let rendered = format!("{policy:?}");
        assert!(rendered.starts_with("Append(Constant("));
        assert!(rendered.contains("LimitRetries(2)"));
    }

    #[test]
    fn test_custom_debug_is_opaque() {
        let policy = RetryPolicy::from_fn(|_| None);
        assert_eq!(format!("{policy:?}"), "Custom(..)");
    }

    #[test]
    fn test_exponential_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::exponential_backoff(Duration::from_secs(1));
        let status = RetryStatus {
            counter: 80,
            ..RetryStatus::start()
        };
        assert!(policy.delay(&status).is_some());
    }

    #[test]
    fn test_simulate_stops_at_first_refusal() {
        assert_eq!(delays(&RetryPolicy::never(), 3), vec![None]);
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_full_jitter_stays_in_range() {
        let policy = RetryPolicy::constant_delay(ms(100)).full_jitter();
        for _ in 0..50 {
            let d = policy.delay(&RetryStatus::start()).unwrap();
            assert!(d <= ms(100));
        }
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_equal_jitter_keeps_half() {
        let policy = RetryPolicy::constant_delay(ms(100)).equal_jitter();
        for _ in 0..50 {
            let d = policy.delay(&RetryStatus::start()).unwrap();
            assert!(d >= ms(50) && d <= ms(100));
        }
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_decorrelated_jitter_bounded_by_previous() {
        let policy = RetryPolicy::constant_delay(ms(100)).decorrelated_jitter();
        let status = RetryStatus::start().next(ms(200));
        for _ in 0..50 {
            let d = policy.delay(&status).unwrap();
            assert!(d >= ms(100) && d <= ms(600));
        }
    }
}
