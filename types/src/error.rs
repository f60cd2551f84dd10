//! Error taxonomy shared by the ordered queue and the continuation bridge.
//!
//! Only recoverable failures live here. Usage violations (resuming a continuation
//! twice, taking ownership twice) are panics at the violation site and never
//! become values.

use std::time::Duration;

use thiserror::Error;

/// Type-erased error reported by a legacy callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of an ordered task that did not produce a value.
///
/// `Cancelled` is distinct from `Failed` so callers can tell "never ran or was
/// stopped" apart from "ran and reported an error".
#[derive(Debug, Error)]
pub enum TaskError<E> {
    #[error("task failed: {0}")]
    Failed(E),
    #[error("task was cancelled")]
    Cancelled,
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl<E> TaskError<E> {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }

    /// The body's own error, if that is what this is.
    #[must_use]
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Cancelled | Self::Panicked(_) => None,
        }
    }

    pub fn map_failure<F>(self, f: impl FnOnce(E) -> F) -> TaskError<F> {
        match self {
            Self::Failed(err) => TaskError::Failed(f(err)),
            Self::Cancelled => TaskError::Cancelled,
            Self::Panicked(msg) => TaskError::Panicked(msg),
        }
    }
}

/// The legacy transport became unusable before a reply arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection was invalidated")]
    Invalidated,
    #[error("connection was interrupted")]
    Interrupted,
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a bridged legacy call.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The callback reported a domain error.
    #[error("remote call failed: {0}")]
    Remote(#[source] BoxError),
    /// The connection failed before the callback fired.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    /// The reply payload did not match the expected structure.
    #[error("failed to decode reply payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// The callback supplied neither a value nor an error.
    #[error("reply carried neither a value nor an error")]
    EmptyReply,
    /// Every handle to the continuation was dropped without a resume.
    #[error("continuation was dropped without being resumed")]
    Abandoned,
    #[error("no reply within {0:?}")]
    TimedOut(Duration),
}

impl BridgeError {
    pub fn remote(err: impl Into<BoxError>) -> Self {
        Self::Remote(err.into())
    }

    /// Transport failures and timeouts may succeed on a fresh attempt; decode
    /// failures and remote errors will not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::TimedOut(_))
    }
}
