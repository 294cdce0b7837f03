//! # Emitter: cancellation-aware send endpoint over a bounded channel.
//!
//! An [`Emitter`] is the producer side of a result stream. Producers and
//! streaming tasks receive one by value, emit through it, and let it go when
//! they return; the channel closes once every sender is gone. Consuming the
//! emitter **is** the close, so "close exactly once" and "no send after
//! close" hold by construction.
//!
//! The driver that handed out the emitter keeps its own sender clone until
//! the terminal error has been recorded, which is what makes the stream's
//! closure observable strictly after the error is readable.

use tokio::sync::mpsc;

use crate::context::Context;
use crate::error::TaskError;

/// Producer-side send endpoint bound to one bounded result channel.
pub struct Emitter<T> {
    tx: mpsc::Sender<T>,
}

impl<T: Send> Emitter<T> {
    pub(crate) fn new(tx: mpsc::Sender<T>) -> Self {
        Self { tx }
    }

    /// Sends `value` on the bound channel, honouring `ctx`.
    ///
    /// Returns the cancellation cause if `ctx` cancels before the send
    /// succeeds, or [`TaskError::ResultsClosed`] if the consumer is gone.
    /// The cause is checked both before and during the wait because
    /// `select!` picks among ready branches nondeterministically.
    pub async fn emit(&self, ctx: &Context, value: T) -> Result<(), TaskError> {
        if let Some(cause) = ctx.cause() {
            return Err(cause);
        }

        tokio::select! {
            _ = ctx.cancelled() => Err(ctx.cause().unwrap_or(TaskError::Canceled)),
            sent = self.tx.send(value) => sent.map_err(|_| TaskError::ResultsClosed),
        }
    }

    /// Closes the emitter.
    ///
    /// Equivalent to dropping it; spelled out so producers can make the
    /// hand-back explicit.
    pub fn close(self) {}
}
