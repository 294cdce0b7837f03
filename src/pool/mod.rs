//! # Worker pool: heterogeneous work over a fixed worker set.
//!
//! A [`WorkerPool`] multiplexes queued, single-shot tasks over `W` workers
//! sharing one resource (a database handle, an HTTP client, ...):
//!
//! ```text
//! submit(ctx, task) ──► bounded request queue ──► worker 1..W
//!                                                   │
//!                            Arc<R> shared resource ┘
//! ```
//!
//! The queue carries only [`ValuelessTask`]s; the wrappers behind the
//! submit helpers adapt the richer task shapes and route values and
//! terminal errors back to the caller through a [`TaskResult`].
//!
//! ## Lifecycle
//! `Unstarted → Running → Closed`. [`WorkerPool::start`] panics on repeat,
//! [`WorkerPool::close`] is idempotent and, if the pool was started,
//! blocks until the queue is drained and every worker has exited.
//! Submitting to a closed pool panics: callers must sequence `close` after
//! all submissions.
//!
//! ## Which submit to use
//! - [`submit`]: one value out of one task.
//! - [`submit_streaming`] / [`submit_streaming_buffered`]: a callback per
//!   value as the task produces them.
//! - [`submit_streaming_collect_all`]: everything into a `Vec` (tests,
//!   demos).
//! - [`submit_func`]: fire a valueless function, get its error back.

#[allow(clippy::module_inception)]
mod pool;
mod submit;
mod task;

pub use pool::WorkerPool;
pub use submit::{
    submit, submit_func, submit_streaming, submit_streaming_buffered,
    submit_streaming_collect_all,
};
pub use task::{StreamingTask, Task, TaskResult, ValuelessTask};
