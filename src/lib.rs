//! # workstream
//!
//! **Workstream** is a library of interlocking concurrency primitives for
//! long-running tokio processes: stream values out of producers, fan work
//! across a fixed worker set, and serialise state mutations behind
//! versioned snapshots, with structured lifetime, cancellation, and
//! back-pressure throughout.
//!
//! ## Features
//!
//! | Area             | Description                                                          | Key types / functions                               |
//! |------------------|----------------------------------------------------------------------|-----------------------------------------------------|
//! | **Context**      | Hierarchical cancellation carrying the *cause* to every waiter.      | [`Context`], [`ContextGuard`]                       |
//! | **Generator**    | One producer streaming into a bounded channel, with a completion handle. | [`Generator`], [`Producer`], [`Emitter`]        |
//! | **Worker pool**  | Heterogeneous tasks over `W` workers sharing one resource.           | [`WorkerPool`], [`Task`], [`StreamingTask`], [`submit`] |
//! | **Event loop**   | Single-worker state mutation with immutable versioned snapshots.     | [`EventLoop`], [`Event`], [`StateSnapshot`]         |
//! | **Sync**         | Mutex with cancellable acquisition.                                  | [`ContextLock`], [`LockGuard`]                      |
//! | **Errors**       | One enum: causes, failures, and the `Stop`/`EventLoopClosed` sentinels. | [`TaskError`]                                    |
//!
//! ## Example
//!
//! ```rust
//! use workstream::{Context, StateSnapshot, EventLoop, send_and_wait};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ctx = Context::background();
//!
//! let el = EventLoop::new(StateSnapshot::new(0u64));
//! el.start();
//!
//! let snap = send_and_wait(&ctx, &el, |_gen, count: u64| count + 1)
//!     .await
//!     .expect("loop is running");
//! assert_eq!((snap.generation(), snap.state()), (1, 1));
//!
//! el.close().await;
//! # }
//! ```
//!
//! ## Shape of every operation
//!
//! Submitting work returns immediately or with the context's cancellation
//! cause; completion is observed through a second handle (a result channel,
//! a [`TaskResult`], a generation to wait for). Cancellation causes travel
//! unchanged: a waiter never sees a generic "canceled" when a more
//! specific cause was recorded.
//!
//! Programmer errors fail loudly: starting a generator or pool twice,
//! submitting to a closed pool, and constructing a pool with zero workers
//! all panic.

mod context;
mod emitter;
mod error;
mod eventloop;
mod generator;
mod pool;
mod sync;

// ---- Public re-exports ----

pub use context::{Context, ContextGuard};
pub use emitter::Emitter;
pub use error::TaskError;
pub use eventloop::{
    send_and_wait, wait_for_generation, watch_state, Event, EventLoop, GenerationID,
    StateSnapshot,
};
pub use generator::{Generator, Producer};
pub use pool::{
    submit, submit_func, submit_streaming, submit_streaming_buffered,
    submit_streaming_collect_all, StreamingTask, Task, TaskResult, ValuelessTask, WorkerPool,
};
pub use sync::{ContextLock, LockGuard};
