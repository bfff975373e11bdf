//! Demonstrates debug events forwarded to tracing
//!
//! Run with: cargo run --example tracing_demo

use std::time::Duration;

use undertow::debug::Debugger;
use undertow::exp::{Exp, ListExp, PairExp};
use undertow::{Effect, Error, RetryPolicy};

fn main() {
    // Set up tracing subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    tracing::info!("Starting tracing demo");

    let debugger = Debugger::tracing().with_context("order-1001");

    // A small workflow where every step reports its outcome
    let process = debugger.expression("process-data");
    let save = debugger.expression("save");
    let result = fetch_data()
        .debug(debugger.expression("fetch-data"))
        .and_then(move |data| process_data(data).debug(process.clone()))
        .and_then(move |processed| save_result(processed).debug(save.clone()))
        .run_blocking();

    match result {
        Ok(id) => tracing::info!("Workflow completed successfully: {}", id),
        Err(e) => tracing::error!("Workflow failed: {}", e),
    }

    // A combinator reports on itself and on every branch
    tracing::info!("Running parallel tasks");
    let parallel = ListExp::par((1..=3).map(|n| {
        Effect::sleep(Duration::from_millis(10 * n)).map(move |()| n)
    }))
    .debug_each(&debugger)
    .run_blocking();
    tracing::info!("Parallel tasks result: {:?}", parallel);

    // Failed attempts are reported too, and retries are logged by the runtime
    let flaky = PairExp::seq(Effect::succeed("inventory"), Effect::<u32>::fail("warehouse offline"))
        .into_effect()
        .debug(debugger.expression("reserve-stock"))
        .retry(RetryPolicy::constant_delay(Duration::from_millis(20)).append(RetryPolicy::limit_retries(2)));
    if let Err(e) = flaky.run_blocking() {
        tracing::error!("Reservation failed: {}", e);
    }
}

fn fetch_data() -> Effect<String> {
    Effect::succeed("raw data".to_string())
}

fn process_data(data: String) -> Effect<String> {
    Effect::defer(move || Ok::<_, Error>(format!("processed: {data}")))
}

fn save_result(_data: String) -> Effect<i32> {
    Effect::succeed(42)
}
