//! Error taxonomy for the engine boundary.
//!
//! `EngineError` is returned by call-site operations (submit, transaction
//! management, cancellation lookups). It never crosses into a command's
//! own completion, which instead resolves to a [`Disposition`].

use thiserror::Error;

/// Errors returned directly from a façade call, as opposed to a command's
/// eventual completion (see [`Disposition`]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("priority channel is at capacity")]
    QueueFull,

    #[error("manager is shutting down or not yet connected")]
    InvalidState,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("adapter failed to allocate a parameter or result blob")]
    OutOfMemory,

    #[error("unknown command or transaction id")]
    NotFound,

    #[error("blocking submit timed out waiting for a result")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Why a command did not complete successfully. Carried inside
/// [`Disposition::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The adapter reported a link-level failure; the connection
    /// supervisor has already been notified.
    Link,
    /// The adapter did not respond within its own operation timeout.
    Timeout,
    /// The device rejected the command; the adapter's own diagnostic
    /// text, if any.
    Command(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Link => write!(f, "link failure"),
            FailureReason::Timeout => write!(f, "operation timeout"),
            FailureReason::Command(msg) => write!(f, "command error: {msg}"),
        }
    }
}

/// Terminal disposition of a command, delivered exactly once to its
/// completion slot (blocking rendezvous or callback).
#[derive(Debug, Clone)]
pub enum Disposition<O> {
    Completed(O),
    Failed(FailureReason),
    Cancelled,
}

impl<O> Disposition<O> {
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Disposition::Completed(_))
    }
}

/// What an adapter's `execute` call returns, before the worker has
/// updated connection state or statistics.
#[derive(Debug, Clone)]
pub enum ExecuteOutcome<O> {
    Success(O),
    LinkFailure,
    Timeout,
    CommandFailed(String),
}

/// Everything `submit_blocking` can return.
#[derive(Debug, Clone)]
pub enum BlockingOutcome<O> {
    Success(O),
    Failed(FailureReason),
    Cancelled,
    /// The caller's own wait expired; the command may still be in
    /// flight and, if so, its eventual result is discarded.
    Timeout,
    QueueFull,
    InvalidState,
}
