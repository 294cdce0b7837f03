//! # Waiting for the loop to reach a generation.

use std::sync::Arc;

use crate::context::Context;
use crate::error::TaskError;
use crate::eventloop::event::Event;
use crate::eventloop::eventloop::{EventLoop, GenerationID};
use crate::eventloop::snapshot::StateSnapshot;

/// Waits until the loop publishes a snapshot at or past `generation`.
///
/// Three-way wait: the context's cancellation cause wins if it fires first;
/// if the loop's done signal fires, the snapshot is **re-read** before
/// giving up, because `select!` picks among ready branches
/// nondeterministically and can report the close ahead of a snapshot that
/// landed concurrently. Only then is [`TaskError::EventLoopClosed`]
/// returned.
pub async fn wait_for_generation<S: Clone + Send + Sync + 'static>(
    ctx: &Context,
    el: &EventLoop<S>,
    generation: GenerationID,
) -> Result<Arc<StateSnapshot<S>>, TaskError> {
    let done = el.done();

    loop {
        let snapshot = el.snapshot();
        if snapshot.generation() >= generation {
            return Ok(snapshot);
        }

        tokio::select! {
            _ = ctx.cancelled() => return Err(ctx.cause().unwrap_or(TaskError::Canceled)),
            _ = done.cancelled() => {
                let snapshot = el.snapshot();
                if snapshot.generation() >= generation {
                    return Ok(snapshot);
                }
                return Err(TaskError::EventLoopClosed);
            }
            _ = snapshot.expired() => {}
        }
    }
}

/// Sends an event and waits for its snapshot.
///
/// Equivalent to [`EventLoop::send`] followed by [`wait_for_generation`]
/// with the returned generation.
pub async fn send_and_wait<S: Clone + Send + Sync + 'static>(
    ctx: &Context,
    el: &EventLoop<S>,
    event: impl Event<S>,
) -> Result<Arc<StateSnapshot<S>>, TaskError> {
    let generation = el.send(ctx, event).await?;

    wait_for_generation(ctx, el, generation).await
}
