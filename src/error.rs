//! Failure type shared by every effect.
//!
//! An effect either succeeds with a value or fails with an [`Error`]. The
//! outcome of a run is the crate's [`Result`] alias, so callers match on it
//! exhaustively like any other `Result`.
//!
//! # Context trails
//!
//! Errors can accumulate context as they propagate outwards, which makes it
//! easier to see what was being attempted when something failed:
//!
//! ```
//! use undertow::Error;
//!
//! let err = Error::msg("connection refused")
//!     .context("connecting to database")
//!     .context("loading user profile");
//!
//! assert_eq!(err.root_cause().to_string(), "connection refused");
//! assert_eq!(
//!     err.context_trail(),
//!     vec!["connecting to database", "loading user profile"]
//! );
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of running an effect.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why an effect failed.
///
/// `Error` is cheap to clone: foreign errors are kept behind an `Arc`, so a
/// cached effect or a debug event can hold on to the same failure that is
/// returned to the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A computation failed with a foreign error.
    #[error(transparent)]
    Failed(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// A computation failed with a plain message.
    #[error("{0}")]
    Message(String),

    /// A user closure panicked while the effect was evaluated.
    #[error("computation panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// The effect did not complete in time.
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// The limit that was exceeded.
        duration: Duration,
    },

    /// The computation was dropped before it reported a result.
    #[error("computation cancelled: {reason}")]
    Cancelled {
        /// What dropped the computation.
        reason: String,
    },

    /// An error annotated with what the caller was doing.
    #[error("{context}: {source}")]
    Context {
        /// Description of the operation that failed.
        context: String,
        /// The wrapped failure.
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap a foreign error.
    ///
    /// ```
    /// use undertow::Error;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    /// let err = Error::new(io);
    /// assert!(err.downcast_ref::<std::io::Error>().is_some());
    /// ```
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Failed(Arc::new(error))
    }

    /// Create an error from a message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Error::Message(message.to_string())
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Error::Timeout { duration }
    }

    /// Create a cancellation error.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Error::Cancelled {
            reason: reason.into(),
        }
    }

    /// Convert a captured panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Error::Panicked { message }
    }

    /// Convert a failed tokio join into an error.
    pub(crate) fn from_join(error: tokio::task::JoinError) -> Self {
        if error.is_panic() {
            Error::from_panic(error.into_panic())
        } else {
            Error::cancelled("task was aborted")
        }
    }

    /// Add a context layer.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every context layer removed.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Error::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Context messages from the innermost layer to the outermost.
    pub fn context_trail(&self) -> Vec<&str> {
        let mut trail = Vec::new();
        let mut current = self;
        while let Error::Context { context, source } = current {
            trail.push(context.as_str());
            current = source;
        }
        trail.reverse();
        trail
    }

    /// Returns true if the root cause is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.root_cause(), Error::Timeout { .. })
    }

    /// Returns true if the root cause is a captured panic.
    pub fn is_panic(&self) -> bool {
        matches!(self.root_cause(), Error::Panicked { .. })
    }

    /// Returns true if the root cause is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Error::Cancelled { .. })
    }

    /// Borrow the root foreign error as a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self.root_cause() {
            Error::Failed(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::new(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::new(error)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Message(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Message(message.to_string())
    }
}
