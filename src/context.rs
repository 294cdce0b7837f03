//! # Context: ambient, hierarchical cancellation with a cause.
//!
//! Every blocking operation in this crate takes a [`Context`]. It wraps a
//! [`CancellationToken`] together with a write-once cause slot, so that the
//! error that *triggered* cancellation survives the trip to whoever was
//! waiting:
//!
//! ```text
//! parent ──child()──► child ──child()──► grandchild
//!   │ cancel(cause)       │                  │
//!   └── token fans out ───┴──────────────────┘
//!        cause() on any descendant walks up to the recorded cause
//! ```
//!
//! ## Rules
//! - `cancel` records the cause **before** firing the token, so a waiter
//!   woken by `cancelled()` always observes the recorded cause.
//! - The first recorded cause wins; later cancels are no-ops.
//! - A cancelled context with no recorded cause anywhere in its chain
//!   reports [`TaskError::Canceled`].
//!
//! ## Example
//! ```rust
//! use workstream::{Context, TaskError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let root = Context::background();
//! let ctx = root.child();
//! ctx.cancel(TaskError::fail("shutting down"));
//!
//! assert!(ctx.is_cancelled());
//! assert_eq!(ctx.cause(), Some(TaskError::fail("shutting down")));
//! # }
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Ambient cancellation carrier with a cause.
///
/// Cheap to clone; clones share the same token and cause slot. Derive
/// children with [`Context::child`] to compose parent cancellation with an
/// added trigger.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    token: CancellationToken,
    cause: OnceLock<TaskError>,
    parent: Option<Arc<Inner>>,
}

impl Context {
    /// Returns a root context that the library never cancels.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                cause: OnceLock::new(),
                parent: None,
            }),
        }
    }

    /// Derives a child context.
    ///
    /// The child is cancelled when the parent is cancelled or when
    /// [`Context::cancel`] is called on the child directly. Cancelling the
    /// child does not affect the parent.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: self.inner.token.child_token(),
                cause: OnceLock::new(),
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    /// Derives a child context that cancels itself with
    /// [`TaskError::DeadlineExceeded`] after `timeout`.
    ///
    /// The timer task is abandoned early if the child is cancelled first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let child = self.child();
        let timed = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(timeout) => timed.cancel(TaskError::DeadlineExceeded),
                _ = timed.cancelled() => {}
            }
        });

        child
    }

    /// Cancels this context, recording `cause` for waiters.
    ///
    /// The cause is recorded before the token fires; the first recorded
    /// cause wins and later calls are no-ops.
    pub fn cancel(&self, cause: TaskError) {
        let _ = self.inner.cause.set(cause);
        self.inner.token.cancel();
    }

    /// Completes when the context is cancelled.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await;
    }

    /// Whether the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Returns the error that caused cancellation, or `None` while the
    /// context is live.
    ///
    /// Resolution walks the chain: this context's slot first, then each
    /// ancestor's. A cancelled context with no recorded cause reports
    /// [`TaskError::Canceled`].
    pub fn cause(&self) -> Option<TaskError> {
        if !self.is_cancelled() {
            return None;
        }

        let mut current = Some(&self.inner);
        while let Some(inner) = current {
            if let Some(cause) = inner.cause.get() {
                return Some(cause.clone());
            }
            current = inner.parent.as_ref();
        }

        Some(TaskError::Canceled)
    }

    /// Wraps this context in a guard that cancels it (with
    /// [`TaskError::Canceled`]) when dropped.
    ///
    /// Used wherever a derived context must not outlive its scope, the same
    /// way the pool's streaming submit guards its per-call child.
    pub fn drop_guard(self) -> ContextGuard {
        ContextGuard { ctx: self }
    }
}

/// Cancels the wrapped context on drop.
pub struct ContextGuard {
    ctx: Context,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.ctx.cancel(TaskError::Canceled);
    }
}
