//! # Event: a single state mutation.
//!
//! Events run on the loop worker, one at a time. `dispatch` receives the
//! generation the resulting snapshot will carry and a clone of the current
//! state; whatever it returns becomes that snapshot's state.
//!
//! Closures implement the trait, so most events are written inline:
//!
//! ```rust
//! use workstream::{Context, EventLoop, StateSnapshot};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let el = EventLoop::new(StateSnapshot::new(0u64));
//! el.start();
//!
//! let ctx = Context::background();
//! let gen = el.send(&ctx, |_gen, count: u64| count + 1).await.expect("send");
//! assert_eq!(gen, 1);
//! el.close().await;
//! # }
//! ```

use crate::eventloop::eventloop::GenerationID;

/// User-supplied state-mutating event body.
///
/// ## Contract
/// - Runs on the loop worker; must not block it indefinitely.
/// - A pure function of the input state plus whatever it reads from the
///   event value. Side channels (spawning, channels) see the state clone
///   only; mutations after return are not persisted.
pub trait Event<S>: Send + 'static {
    /// Produces the next state.
    ///
    /// `generation` is the id of the snapshot this dispatch will produce.
    fn dispatch(self: Box<Self>, generation: GenerationID, state: S) -> S;
}

impl<S, F> Event<S> for F
where
    F: FnOnce(GenerationID, S) -> S + Send + 'static,
{
    fn dispatch(self: Box<Self>, generation: GenerationID, state: S) -> S {
        (*self)(generation, state)
    }
}
