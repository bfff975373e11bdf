//! Integration tests for bracket resource management with tokio file I/O.
//!
//! These tests verify that the bracket pattern correctly handles real-world
//! async I/O operations, ensuring resources are always released.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use undertow::{Effect, Error};

// ============================================================================
// File I/O Integration Tests
// ============================================================================

/// Helper to create a unique temp file path
fn temp_file_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("undertow_bracket_test_{}_{}.txt", name, std::process::id()))
}

fn create_file(path: PathBuf, content: &'static str) -> Effect<PathBuf> {
    Effect::from_async(move || {
        let path = path.clone();
        async move {
            tokio::fs::write(&path, content).await?;
            Ok::<_, Error>(path)
        }
    })
}

fn remove_file(path: Arc<PathBuf>, released: Arc<AtomicBool>) -> Effect<()> {
    Effect::from_async(move || {
        let path = path.clone();
        let released = released.clone();
        async move {
            released.store(true, Ordering::SeqCst);
            if tokio::fs::try_exists(path.as_ref()).await? {
                tokio::fs::remove_file(path.as_ref()).await?;
            }
            Ok::<_, Error>(())
        }
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn bracket_removes_temp_file_on_success() {
    let path = temp_file_path("success");
    let released = Arc::new(AtomicBool::new(false));
    let flag = released.clone();

    let effect = Effect::bracket(
        create_file(path.clone(), "test content"),
        |p: Arc<PathBuf>| {
            Effect::from_async(move || {
                let p = p.clone();
                async move { Ok::<_, Error>(tokio::fs::read_to_string(p.as_ref()).await?) }
            })
        },
        move |p| remove_file(p, flag.clone()),
    );

    assert_eq!(effect.run().await.unwrap(), "test content");
    assert!(released.load(Ordering::SeqCst), "release should have run");
    assert!(!path.exists(), "temp file should be gone");
}

#[tokio::test(flavor = "multi_thread")]
async fn bracket_removes_temp_file_when_use_fails() {
    let path = temp_file_path("use_fails");
    let released = Arc::new(AtomicBool::new(false));
    let flag = released.clone();

    let effect: Effect<String> = Effect::bracket(
        create_file(path.clone(), "unused"),
        |_| Effect::fail("processing failed"),
        move |p| remove_file(p, flag.clone()),
    );

    let error = effect.run().await.unwrap_err();
    assert_eq!(error.to_string(), "processing failed");
    assert!(released.load(Ordering::SeqCst));
    assert!(!path.exists());
}

#[tokio::test]
async fn bracket_skips_use_and_release_when_acquire_fails() {
    let used = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let (u, r) = (used.clone(), released.clone());

    let missing = temp_file_path("never_created");
    let acquire = Effect::from_async(move || {
        let missing = missing.clone();
        async move { Ok::<_, Error>(tokio::fs::read_to_string(&missing).await?) }
    });

    let effect = Effect::bracket(
        acquire,
        move |_| {
            u.fetch_add(1, Ordering::SeqCst);
            Effect::unit()
        },
        move |_| {
            r.fetch_add(1, Ordering::SeqCst);
            Effect::unit()
        },
    );

    let error = effect.run().await.unwrap_err();
    assert!(error.downcast_ref::<std::io::Error>().is_some());
    assert_eq!(used.load(Ordering::SeqCst), 0);
    assert_eq!(released.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Error Precedence
// ============================================================================

#[test]
fn use_failure_wins_over_release_failure() {
    let effect: Effect<()> = Effect::bracket(
        Effect::succeed(1),
        |_| Effect::fail("use failed"),
        |_| Effect::fail("release failed"),
    );
    assert_eq!(effect.run_blocking().unwrap_err().to_string(), "use failed");
}

#[test]
fn release_failure_surfaces_after_successful_use() {
    let effect = Effect::bracket(
        Effect::succeed(1),
        |n: Arc<i32>| Effect::succeed(*n + 1),
        |_| Effect::fail(Error::msg("release failed")),
    );
    assert_eq!(effect.run_blocking().unwrap_err().to_string(), "release failed");
}

#[test]
fn bracket_is_rerunnable() {
    let acquired = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let (a, r) = (acquired.clone(), released.clone());

    let effect = Effect::bracket(
        Effect::lazy(move || a.fetch_add(1, Ordering::SeqCst)),
        |n: Arc<usize>| Effect::succeed(*n),
        move |_| {
            r.fetch_add(1, Ordering::SeqCst);
            Effect::unit()
        },
    );

    assert_eq!(effect.run_blocking().unwrap(), 0);
    assert_eq!(effect.run_blocking().unwrap(), 1);
    assert_eq!(acquired.load(Ordering::SeqCst), 2);
    assert_eq!(released.load(Ordering::SeqCst), 2);
}
