//! Retry Patterns Example
//!
//! Demonstrates retry and resilience patterns for effects.
//! Shows practical patterns including:
//! - Basic retry with different backoff strategies
//! - Conditional retry (retry_if)
//! - Layering limits onto delay schedules
//! - Timeout handling combined with retry

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use undertow::{Effect, Error, RetryPolicy};

// ==================== Basic Retry ====================

/// Example 1: Basic retry with exponential backoff
///
/// Demonstrates retrying an operation that fails transiently.
fn example_basic_retry() {
    println!("\n=== Example 1: Basic Retry ===");

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let effect = Effect::defer(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        println!("  Attempt {}", n + 1);
        if n < 2 {
            Err(Error::msg("transient failure"))
        } else {
            Ok("success!")
        }
    });

    let policy = RetryPolicy::exponential_backoff(Duration::from_millis(100))
        .append(RetryPolicy::limit_retries(5));

    match effect.retry(policy).run_blocking() {
        Ok(value) => println!("Success after {} attempts: {}", attempts.load(Ordering::SeqCst), value),
        Err(error) => println!("Failed: {}", error),
    }
}

// ==================== Different Backoff Strategies ====================

/// Example 2: Comparing different backoff strategies
///
/// Shows how delay increases with different strategies.
fn example_backoff_strategies() {
    println!("\n=== Example 2: Backoff Strategies ===");

    let base = Duration::from_millis(100);
    let limit = || RetryPolicy::limit_retries(5);
    let strategies = [
        ("Constant", RetryPolicy::constant_delay(base).append(limit())),
        ("Incremental", RetryPolicy::incremental_delay(base).append(limit())),
        ("Exponential", RetryPolicy::exponential_backoff(base).append(limit())),
        ("Fibonacci", RetryPolicy::fibonacci(base).append(limit())),
    ];

    for (name, policy) in strategies {
        let delays: Vec<_> = policy
            .simulate(10)
            .into_iter()
            .filter_map(|(_, delay)| delay)
            .collect();
        println!("{name:>12}: {delays:?}");
    }
}

// ==================== Conditional Retry ====================

/// Example 3: Only retry failures worth retrying
fn example_retry_if() {
    println!("\n=== Example 3: Conditional Retry ===");

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let effect: Effect<()> = Effect::defer(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            println!("  Attempt 1: request timed out");
            Err(Error::timeout(Duration::from_millis(200)))
        } else {
            println!("  Attempt {}: permission denied", n + 1);
            Err(Error::msg("permission denied"))
        }
    });

    let result = effect
        .retry_if(Error::is_timeout, RetryPolicy::limit_retries(5))
        .run_blocking();

    println!(
        "Gave up after {} attempts: {}",
        attempts.load(Ordering::SeqCst),
        result.unwrap_err()
    );
}

// ==================== Policy Composition ====================

/// Example 4: Fast retries first, then slow ones, with a total budget
fn example_policy_composition() {
    println!("\n=== Example 4: Policy Composition ===");

    let fast = RetryPolicy::constant_delay(Duration::from_millis(10)).append(RetryPolicy::limit_retries(3));
    let slow = RetryPolicy::exponential_backoff(Duration::from_millis(200)).cap_delay(Duration::from_secs(1));
    let policy = fast
        .followed_by(slow)
        .limit_retries_by_cumulative_delay(Duration::from_secs(3));

    for (status, delay) in policy.simulate(20) {
        match delay {
            Some(delay) => println!(
                "  retry {:>2}: wait {:?} (waited {:?} so far)",
                status.counter + 1,
                delay,
                status.cumulative_delay
            ),
            None => println!("  stop after {} retries", status.counter),
        }
    }
}

// ==================== Timeout + Retry ====================

/// Example 5: Retrying an operation that sometimes hangs
///
/// Each attempt gets its own timeout; the retry policy decides what to do
/// with the timeouts.
fn example_timeout_with_retry() {
    println!("\n=== Example 5: Timeout + Retry ===");

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let connect = Effect::from_async(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < 2 {
                println!("  Attempt {}: hanging...", n + 1);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, Error>("connected!")
        }
    });

    let result = connect
        .timeout(Duration::from_millis(100))
        .retry(RetryPolicy::constant_delay(Duration::from_millis(50)).append(RetryPolicy::limit_retries(5)))
        .run_blocking();

    println!(
        "Result after {} attempts: {:?}",
        attempts.load(Ordering::SeqCst),
        result
    );
}

fn main() {
    example_basic_retry();
    example_backoff_strategies();
    example_retry_if();
    example_policy_composition();
    example_timeout_with_retry();
}
