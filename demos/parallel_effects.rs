//! Parallel Effect Execution Examples
//!
//! This example demonstrates running independent effects concurrently with
//! the combinator expressions, and how the same expression reads in
//! sequential mode.
//!
//! Run with: cargo run --example parallel_effects

use std::time::{Duration, Instant};

use serde::Serialize;
use undertow::prelude::*;

// Mock types for demonstration
#[derive(Debug, Clone, Serialize)]
struct User {
    id: i32,
    name: String,
}

fn fetch_user(id: i32, delay_ms: u64) -> Effect<User> {
    Effect::sleep(Duration::from_millis(delay_ms)).and_then(move |()| {
        if id > 0 {
            Effect::succeed(User {
                id,
                name: format!("User {id}"),
            })
        } else {
            Effect::fail(format!("no user with id {id}"))
        }
    })
}

fn fetch_count(label: &'static str, count: u32, delay_ms: u64) -> Effect<u32> {
    Effect::sleep(Duration::from_millis(delay_ms)).map(move |()| {
        println!("  loaded {label}");
        count
    })
}

// Example 1: seq vs par on the same list
//
// The expression is the same; only the mode changes how long it takes.
fn example_list_modes() {
    println!("\n=== Example 1: ListExp seq vs par ===\n");

    for mode in [Mode::Sequential, Mode::Parallel] {
        let users = ListExp::with_mode(mode, (1..=3).map(|id| fetch_user(id, 100)));
        let start = Instant::now();
        match users.run_blocking() {
            Ok(users) => println!(
                "✓ {}: loaded {} users in {:?}",
                mode.label(),
                users.len(),
                start.elapsed()
            ),
            Err(error) => println!("✗ {}: {}", mode.label(), error),
        }
    }
}

// Example 2: Heterogeneous results
//
// PairExp and TripleExp keep each branch's own type.
fn example_heterogeneous() {
    println!("\n=== Example 2: TripleExp ===\n");

    let dashboard = TripleExp::par(
        fetch_user(7, 80),
        fetch_count("notifications", 3, 120),
        fetch_count("messages", 12, 60),
    );

    let start = Instant::now();
    let (user, notifications, messages) = dashboard.join_blocking();
    println!(
        "✓ {} has {} notifications and {} messages ({:?})",
        user.name,
        notifications,
        messages,
        start.elapsed()
    );
}

// Example 3: Failure ordering
//
// In parallel every branch finishes; the failure reported is the one with
// the lowest position, not the first to happen.
fn example_failure_ordering() {
    println!("\n=== Example 3: Failure Ordering ===\n");

    let users = ListExp::par(vec![fetch_user(1, 10), fetch_user(-1, 200), fetch_user(-2, 20)]);
    match users.run_blocking() {
        Ok(_) => println!("unexpected success"),
        Err(error) => println!("✗ reported: {error}"),
    }
}

// Example 4: Assembling a JSON document
fn example_json_document() {
    println!("\n=== Example 4: ObjExp ===\n");

    let profile = ObjExp::par()
        .field("user", fetch_user(42, 50))
        .field("unread", fetch_count("unread", 5, 50))
        .field(
            "badges",
            ArrExp::seq()
                .item(Effect::succeed("early-adopter"))
                .item(Effect::succeed("reviewer")),
        );

    match profile.run_blocking() {
        Ok(doc) => println!("{doc:#}"),
        Err(error) => println!("✗ {error}"),
    }
}

// Example 5: Branching
fn example_branching() {
    println!("\n=== Example 5: CondExp and SwitchExp ===\n");

    let plan = SwitchExp::on(fetch_count("seats", 25, 10))
        .case_when(|seats: &u32| *seats >= 100, |_| Effect::succeed("enterprise"))
        .case_when(|seats: &u32| *seats >= 10, |_| Effect::succeed("team"))
        .otherwise(|_| Effect::succeed("solo"));

    let greeting = CondExp::par()
        .clause(AnyExp::par([Effect::succeed(false), Effect::succeed(true)]), || {
            Effect::succeed("welcome back")
        })
        .otherwise(|| Effect::succeed("welcome"));

    let (plan, greeting) = PairExp::par(plan, greeting).join_blocking();
    println!("✓ plan: {plan}, greeting: {greeting}");
}

fn main() {
    example_list_modes();
    example_heterogeneous();
    example_failure_ordering();
    example_json_document();
    example_branching();
}
