//! Crate-wide error type.
//!
//! Mirrors the propagation policy in the specification: local stage
//! failures are carried as data (`enrichment::StageOutcome`), not as
//! `Result::Err`; this type is for the failures that actually abort an
//! operation.

use crate::bounds::BoundKind;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Every error kind the core reports (spec §7).
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Empty content, invalid config, disallowed state transition, unknown domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Store key missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Engine was started twice.
    #[error("engine already started")]
    AlreadyStarted,

    /// An operation requires a started engine.
    #[error("engine not started")]
    NotStarted,

    /// Enqueue could not place a job; the bounded queue is full.
    #[error("enrichment queue is full")]
    QueueFull,

    /// A graph traversal hit one of its configured limits.
    #[error("bounds exceeded: {0:?}")]
    BoundsExceeded(BoundKind),

    /// The ambient cancellation token was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The ambient cancellation token's deadline elapsed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A store, search, or LLM collaborator returned an error.
    #[error("external collaborator unavailable: {0}")]
    ExternalUnavailable(String),

    /// LLM output could not be parsed into the expected shape.
    #[error("failed to parse model output: {0}")]
    Parse(String),
}

impl Error {
    /// True for the two cancellation-flavored variants, which callers
    /// generally want to treat the same way as "stop, but don't log as
    /// a bug".
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}
