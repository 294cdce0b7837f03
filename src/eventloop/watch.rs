//! # Watching snapshot transitions.
//!
//! [`watch_state`] spawns an observer that follows a loop's published
//! snapshots. Guarantees, in the order they matter:
//!
//! - the watcher runs with the **initial** snapshot first;
//! - at most one invocation is in flight at a time;
//! - it never runs twice for the same generation;
//! - it may **skip** generations if it is slower than the loop: it always
//!   picks up the latest snapshot, not the next one;
//! - when the loop closes, it runs with the **final** snapshot before the
//!   returned token fires.
//!
//! The watcher returns `false` to stop the watch; its child context is
//! cancelled on the way out either way.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::eventloop::eventloop::{load, EventLoop};
use crate::eventloop::snapshot::StateSnapshot;

/// Spawns a watcher over the loop's snapshots.
///
/// Returns a token that is cancelled when the watch ends: the watcher
/// returned `false`, the context was cancelled, or the loop closed (after
/// the final snapshot was observed).
pub fn watch_state<S, F, Fut>(
    ctx: &Context,
    el: &EventLoop<S>,
    mut watcher: F,
) -> CancellationToken
where
    S: Clone + Send + Sync + 'static,
    F: FnMut(Context, Arc<StateSnapshot<S>>) -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send,
{
    let finished = CancellationToken::new();
    let cell = el.cell();
    let loop_done = el.done();
    let child = ctx.child();

    let signal = finished.clone();
    tokio::spawn(async move {
        let _finished_guard = signal.drop_guard();
        let _ctx_guard = child.clone().drop_guard();

        let mut snapshot = load(&cell);
        loop {
            if !watcher(child.clone(), Arc::clone(&snapshot)).await {
                return;
            }

            tokio::select! {
                _ = child.cancelled() => return,
                _ = loop_done.cancelled() => {
                    // The close may have raced a final dispatch; re-read and
                    // give the watcher one last look if anything changed.
                    let previous = snapshot.generation();
                    snapshot = load(&cell);
                    if snapshot.generation() == previous {
                        return;
                    }
                }
                _ = snapshot.expired() => {
                    snapshot = load(&cell);
                }
            }
        }
    });

    finished
}
