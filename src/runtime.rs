//! Shared tokio runtime and the blocking bridge.
//!
//! Effects are futures underneath. Parallel branches, pool-deferred thunks and
//! [`Effect::start`](crate::Effect::start) need a runtime to spawn onto, and
//! [`Effect::run_blocking`](crate::Effect::run_blocking) needs one to drive
//! the future from synchronous code. This module provides:
//!
//! 1. **A global runtime**, created lazily on first use and never dropped.
//!    Its size can be set once, before first use, with [`configure`].
//! 2. **Handle lookup**: [`handle`] prefers the runtime the caller is already
//!    running on, so tracing context and test-time settings (such as a paused
//!    clock) carry over to spawned branches.
//! 3. **Blocking execution**: [`block_on`] picks a strategy that cannot
//!    deadlock or panic for the caller's context.
//!
//! | Caller context | Strategy |
//! |----------------|----------|
//! | no runtime | `global().block_on` |
//! | multi-thread runtime | `block_in_place` + current handle |
//! | current-thread runtime | spawn on the global runtime, wait on a channel |

use std::future::Future;
use std::sync::{mpsc, LazyLock, OnceLock};

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::error::{Error, Result};

/// Settings for the global runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of async worker threads.
    pub worker_threads: usize,
    /// Name given to runtime threads.
    pub thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get().max(2),
            thread_name: "undertow-worker".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Set the number of worker threads.
    pub fn with_worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n.max(1);
        self
    }

    /// Set the thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

static GLOBAL_RUNTIME: LazyLock<std::result::Result<Runtime, String>> = LazyLock::new(|| {
    let config = CONFIG.get_or_init(RuntimeConfig::default);
    tracing::debug!(
        worker_threads = config.worker_threads,
        thread_name = %config.thread_name,
        "starting global runtime"
    );
    Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name(config.thread_name.clone())
        .enable_all()
        .build()
        .map_err(|e| e.to_string())
});

/// Configure the global runtime.
///
/// Must be called before anything touches the global runtime; afterwards the
/// configuration is fixed and this returns an error.
///
/// # Errors
///
/// Returns an error if a configuration was already installed, either
/// explicitly or implicitly by first use.
pub fn configure(config: RuntimeConfig) -> Result<()> {
    CONFIG
        .set(config)
        .map_err(|_| Error::msg("global runtime is already configured"))
}

/// The global runtime.
///
/// # Errors
///
/// Returns an error if the runtime could not be built (for example when the
/// OS refuses to spawn threads).
pub fn global() -> Result<&'static Runtime> {
    GLOBAL_RUNTIME
        .as_ref()
        .map_err(|reason| Error::msg(format!("failed to build global runtime: {reason}")))
}

/// Handle of the caller's runtime, or of the global runtime outside one.
///
/// # Errors
///
/// Fails only when falling back to a global runtime that could not be built.
pub fn handle() -> Result<Handle> {
    if let Ok(current) = Handle::try_current() {
        return Ok(current);
    }
    Ok(global()?.handle().clone())
}

/// Drive a future to completion, blocking the calling thread.
///
/// Never call this from inside an effect; compose the effect instead.
///
/// # Errors
///
/// Returns an error when no runtime is available, or when the future was
/// dropped before producing a value.
pub fn block_on<F>(future: F) -> Result<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Ok(current) => match current.runtime_flavor() {
            RuntimeFlavor::MultiThread => {
                Ok(tokio::task::block_in_place(|| current.block_on(future)))
            }
            // block_in_place is unavailable here; hand the future over to the
            // global runtime and park this thread on a channel.
            _ => {
                let (tx, rx) = mpsc::channel();
                global()?.spawn(async move {
                    let _ = tx.send(future.await);
                });
                rx.recv()
                    .map_err(|_| Error::cancelled("blocking task dropped before completion"))
            }
        },
        Err(_) => Ok(global()?.block_on(future)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_block_on_outside_runtime() {
        let value = block_on(async { 21 * 2 }).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_block_on_with_timer() {
        let value = block_on(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            "slept"
        })
        .unwrap();
        assert_eq!(value, "slept");
    }

    #[test]
    fn test_handle_outside_runtime_uses_global() {
        let handle = handle().unwrap();
        assert_eq!(handle.runtime_flavor(), RuntimeFlavor::MultiThread);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_on_inside_multi_thread_runtime() {
        let value = block_on(async { 7 }).unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_block_on_inside_current_thread_runtime() {
        let value = block_on(async { "handed over" }).unwrap();
        assert_eq!(value, "handed over");
    }

    #[tokio::test]
    async fn test_handle_prefers_current_runtime() {
        let handle = handle().unwrap();
        assert_eq!(handle.runtime_flavor(), RuntimeFlavor::CurrentThread);
    }

    #[test]
    fn test_config_builder_clamps_threads() {
        let config = RuntimeConfig::default()
            .with_worker_threads(0)
            .with_thread_name("custom");
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.thread_name, "custom");
    }

    #[test]
    fn test_configure_after_first_use_fails() {
        let _ = global();
        assert!(configure(RuntimeConfig::default()).is_err());
    }
}
