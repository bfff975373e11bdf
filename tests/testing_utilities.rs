//! Tests for the testing utilities, used the way downstream crates would.

use std::time::Duration;

use undertow::debug::{Debugger, RecordingSink};
use undertow::exp::{Exp, ListExp};
use undertow::testing::{CallCounter, StubClock};
use undertow::{assert_failure, assert_failure_message, assert_success, Clock, Effect, RetryPolicy};

#[test]
fn stub_clock_drives_debug_timestamps() {
    let stub = StubClock::starting_at(10);
    let sink = RecordingSink::new();
    let debugger = Debugger::new(sink.clone()).with_timestamp_clock(stub.clock());

    Effect::succeed(()).debug(debugger.expression("tick")).run_blocking().unwrap();
    stub.advance(90);
    Effect::succeed(()).debug(debugger.expression("tock")).run_blocking().unwrap();

    let stamps: Vec<i64> = sink.events().iter().map(|e| e.timestamp).collect();
    assert_eq!(stamps, vec![10, 100]);
}

#[test]
fn stub_clock_converts_into_clock() {
    let clock: Clock = StubClock::stepping(-5, 5).into();
    assert_eq!((clock.now(), clock.now(), clock.now()), (-5, 0, 5));
}

#[test]
fn call_counter_counts_retries() {
    let counter = CallCounter::new();
    let effect = counter.track(Effect::<u8>::fail("flaky"));

    let error = assert_failure!(effect.retry(RetryPolicy::limit_retries(3)).run_blocking());

    assert_eq!(error.to_string(), "flaky");
    assert_eq!(counter.count(), 4);
}

#[test]
fn call_counter_counts_par_branches() {
    let counter = CallCounter::new();
    let list = ListExp::par((0..5).map(|n| counter.succeed(n)));

    let values = assert_success!(list.run_blocking());

    assert_eq!(values, vec![0, 1, 2, 3, 4]);
    assert_eq!(counter.count(), 5);
}

#[test]
fn assert_failure_message_matches_context() {
    let effect = Effect::<()>::fail("disk full").context("saving report");
    assert_failure_message!(effect.run_blocking(), "saving report: disk full");
}

#[test]
#[should_panic(expected = "Expected success, got failure: operation timed out")]
fn assert_success_panics_with_failure() {
    let slow = Effect::sleep(Duration::from_secs(5)).timeout(Duration::from_millis(1));
    assert_success!(slow.run_blocking());
}
