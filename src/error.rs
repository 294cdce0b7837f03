//! # Error types shared by every workstream primitive.
//!
//! The crate has a single error enum, [`TaskError`]. It covers three distinct
//! groups:
//!
//! - **Cancellation causes**: `Canceled`, `DeadlineExceeded`. These are what
//!   [`Context::cause`](crate::Context::cause) hands back; the library
//!   propagates them verbatim and never replaces a recorded cause with a
//!   generic one.
//! - **Execution failures**: `Fail`, `ResultsClosed`. What producers, tasks,
//!   and callbacks report when work goes wrong.
//! - **Sentinels**: `Stop` (a streaming callback ends iteration early,
//!   callers never see it) and `EventLoopClosed` (a waited-for generation
//!   can no longer be reached).
//!
//! Programmer errors (starting a generator or pool twice, submitting to a
//! closed pool, zero workers) are not represented here. They panic.

use thiserror::Error;

/// Errors produced by producers, tasks, callbacks, and the primitives
/// driving them.
///
/// `Clone + PartialEq` so that cancellation causes can be stored once,
/// handed to any number of waiters unchanged, and compared against
/// sentinels.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The context was canceled without a more specific cause.
    #[error("context canceled")]
    Canceled,

    /// A deadline context ran out before the work completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Task execution failed.
    #[error("execution failed: {reason}")]
    Fail {
        /// Human-readable failure description.
        reason: String,
    },

    /// Sentinel returned from a streaming callback to end iteration without
    /// surfacing an error. Submit helpers translate it to success.
    #[error("stop")]
    Stop,

    /// The event loop terminated before the requested generation was
    /// reached.
    #[error("event loop closed")]
    EventLoopClosed,

    /// The consumer side of a result channel is gone; nothing emitted will
    /// ever be observed. Producers should return promptly.
    #[error("results channel closed")]
    ResultsClosed,
}

impl TaskError {
    /// Builds a [`TaskError::Fail`] from anything displayable.
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Canceled => "task_canceled",
            TaskError::DeadlineExceeded => "task_deadline_exceeded",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Stop => "task_stop",
            TaskError::EventLoopClosed => "event_loop_closed",
            TaskError::ResultsClosed => "results_closed",
        }
    }

    /// Whether this error is a cancellation cause rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TaskError::Canceled | TaskError::DeadlineExceeded)
    }

    /// Whether this is the [`TaskError::Stop`] sentinel.
    pub fn is_stop(&self) -> bool {
        matches!(self, TaskError::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
        assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
        assert_eq!(TaskError::EventLoopClosed.as_label(), "event_loop_closed");
    }

    #[test]
    fn classification() {
        assert!(TaskError::Canceled.is_cancellation());
        assert!(TaskError::DeadlineExceeded.is_cancellation());
        assert!(!TaskError::fail("x").is_cancellation());
        assert!(TaskError::Stop.is_stop());
        assert!(!TaskError::Canceled.is_stop());
    }
}
