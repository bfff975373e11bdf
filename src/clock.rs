//! Injectable time sources.
//!
//! A [`Clock`] is a zero-argument source of `i64` ticks. The unit depends on
//! the instance:
//!
//! | Constructor | Unit | Use |
//! |-------------|------|-----|
//! | [`Clock::monotonic`] | nanoseconds since a process-wide anchor | elapsed time only |
//! | [`Clock::real_time`] | milliseconds since the Unix epoch | timestamps |
//! | [`Clock::custom`] | whatever the supplier returns | deterministic tests |
//!
//! Components that need time take a `Clock` explicitly instead of reading a
//! global, so tests can substitute a stub.
//!
//! ```
//! use undertow::Clock;
//!
//! let clock = Clock::custom(|| 42);
//! assert_eq!(clock.now(), 42);
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

static ANCHOR: LazyLock<Instant> = LazyLock::new(Instant::now);

/// A time source.
#[derive(Clone)]
pub struct Clock {
    source: Source,
}

#[derive(Clone)]
enum Source {
    Monotonic,
    RealTime,
    Custom(Arc<dyn Fn() -> i64 + Send + Sync>),
}

impl Clock {
    /// Nanosecond ticks that never go backwards.
    ///
    /// Only differences between two readings are meaningful.
    pub fn monotonic() -> Self {
        Clock {
            source: Source::Monotonic,
        }
    }

    /// Wall-clock milliseconds since the Unix epoch.
    pub fn real_time() -> Self {
        Clock {
            source: Source::RealTime,
        }
    }

    /// Wrap an arbitrary supplier.
    pub fn custom<F>(supplier: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        Clock {
            source: Source::Custom(Arc::new(supplier)),
        }
    }

    /// Read the current tick.
    pub fn now(&self) -> i64 {
        match &self.source {
            Source::Monotonic => saturating_i64(ANCHOR.elapsed().as_nanos()),
            Source::RealTime => match SystemTime::now().duration_since(UNIX_EPOCH) {
                Ok(since_epoch) => saturating_i64(since_epoch.as_millis()),
                Err(before_epoch) => -saturating_i64(before_epoch.duration().as_millis()),
            },
            Source::Custom(supplier) => supplier(),
        }
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.source {
            Source::Monotonic => "monotonic",
            Source::RealTime => "real_time",
            Source::Custom(_) => "custom",
        };
        f.debug_tuple("Clock").field(&kind).finish()
    }
}

fn saturating_i64(value: u128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn test_monotonic_never_decreases() {
        let clock = Clock::monotonic();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn test_real_time_is_after_2020() {
        // 2020-01-01T00:00:00Z in milliseconds
        assert!(Clock::real_time().now() > 1_577_836_800_000);
    }

    #[test]
    fn test_custom_supplier_is_called_each_time() {
        let ticks = Arc::new(AtomicI64::new(0));
        let source = ticks.clone();
        let clock = Clock::custom(move || source.fetch_add(10, Ordering::SeqCst));

        assert_eq!(clock.now(), 0);
        assert_eq!(clock.now(), 10);
        assert_eq!(ticks.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_clones_share_custom_supplier() {
        let clock = Clock::custom(|| 7);
        let cloned = clock.clone();
        assert_eq!(cloned.now(), 7);
    }

    #[test]
    fn test_debug_names_kind() {
        assert_eq!(format!("{:?}", Clock::real_time()), "Clock(\"real_time\")");
        assert_eq!(format!("{:?}", Clock::custom(|| 0)), "Clock(\"custom\")");
    }
}
