//! # Task shapes, wrappers, and the result reader.
//!
//! Workers only ever see a [`ValuelessTask`]. The richer shapes,
//! [`Task`] (one value) and [`StreamingTask`] (zero or more values), are
//! adapted by the wrap functions below, which pair each task with a
//! [`TaskResult`] for the submitting side.
//!
//! ## Rules
//! - Every task is **single-shot**: traits consume `Box<Self>`, there is no
//!   respawning.
//! - Wrappers record the task's terminal outcome into the shared slot
//!   **before** dropping their sender, so the result channel's closure is
//!   observable strictly after the outcome is readable. `drain()` relies on
//!   this ordering.
//! - Closures implement the traits directly: a two-argument async closure
//!   is a [`Task`], a three-argument one (taking an [`Emitter`]) is a
//!   [`StreamingTask`].

use std::future::Future;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::context::Context;
use crate::emitter::Emitter;
use crate::error::TaskError;

/// Internal queue element: a task with no observable output of its own.
///
/// Implement this directly only when no result routing is needed; otherwise
/// go through the submit helpers, which wrap the richer shapes correctly.
#[async_trait]
pub trait ValuelessTask<R>: Send + 'static {
    /// Executes the task with the submit-time context and the pool's shared
    /// resource.
    async fn execute(self: Box<Self>, ctx: Context, resource: Arc<R>);
}

/// Single-value unit of work.
#[async_trait]
pub trait Task<R, V>: Send + 'static {
    /// Produces exactly one value, or an error.
    async fn execute(self: Box<Self>, ctx: Context, resource: Arc<R>) -> Result<V, TaskError>;
}

#[async_trait]
impl<R, V, F, Fut> Task<R, V> for F
where
    R: Send + Sync + 'static,
    V: Send + 'static,
    F: FnOnce(Context, Arc<R>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<V, TaskError>> + Send,
{
    async fn execute(self: Box<Self>, ctx: Context, resource: Arc<R>) -> Result<V, TaskError> {
        (*self)(ctx, resource).await
    }
}

/// Multi-value unit of work: emits through the provided [`Emitter`], then
/// returns an optional terminal error.
#[async_trait]
pub trait StreamingTask<R, V>: Send + 'static {
    /// Runs the task, emitting values as they are produced.
    async fn execute(
        self: Box<Self>,
        ctx: Context,
        resource: Arc<R>,
        emitter: Emitter<V>,
    ) -> Result<(), TaskError>;
}

#[async_trait]
impl<R, V, F, Fut> StreamingTask<R, V> for F
where
    R: Send + Sync + 'static,
    V: Send + 'static,
    F: FnOnce(Context, Arc<R>, Emitter<V>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    async fn execute(
        self: Box<Self>,
        ctx: Context,
        resource: Arc<R>,
        emitter: Emitter<V>,
    ) -> Result<(), TaskError> {
        (*self)(ctx, resource, emitter).await
    }
}

/// Shared slot a wrapper records its task's terminal outcome into.
type OutcomeSlot = Arc<OnceLock<Result<(), TaskError>>>;

/// Reader of a wrapped task's output and terminal error.
pub struct TaskResult<V> {
    receiver: mpsc::Receiver<V>,
    outcome: OutcomeSlot,
}

impl<V> TaskResult<V> {
    /// Receives the next value, or `None` once the task is done and the
    /// stream is drained.
    pub async fn recv(&mut self) -> Option<V> {
        self.receiver.recv().await
    }

    /// Borrows the raw result channel for select-style consumption.
    pub fn results(&mut self) -> &mut mpsc::Receiver<V> {
        &mut self.receiver
    }

    /// Consumes any remaining values and returns the task's terminal error.
    ///
    /// Idempotent: once the channel is closed, further calls are cheap and
    /// return the same value.
    pub async fn drain(&mut self) -> Result<(), TaskError> {
        while self.receiver.recv().await.is_some() {}

        // The wrapper records the outcome before releasing its sender, so a
        // closed channel implies the slot is final. An empty slot means the
        // task was torn down without running to completion.
        self.outcome.get().cloned().unwrap_or(Ok(()))
    }
}

/// Wraps a [`Task`] for pool execution, returning the queue element and the
/// result reader.
///
/// The result channel has capacity 1, so publishing the value never blocks
/// the worker.
pub(crate) fn wrap_task<R, V, T>(task: T) -> (TaskWrapper<R, V, T>, TaskResult<V>)
where
    R: Send + Sync + 'static,
    V: Send + 'static,
    T: Task<R, V>,
{
    let (tx, rx) = mpsc::channel(1);
    let outcome: OutcomeSlot = Arc::new(OnceLock::new());

    let wrapper = TaskWrapper {
        task,
        tx,
        outcome: Arc::clone(&outcome),
        _resource: std::marker::PhantomData,
    };
    let result = TaskResult {
        receiver: rx,
        outcome,
    };

    (wrapper, result)
}

/// Wraps a [`StreamingTask`] for pool execution with the given result
/// buffer size.
///
/// A `buffer` of 0 is treated as 1; a small buffer keeps the worker from
/// stalling between the consumer's reads.
pub(crate) fn wrap_streaming_task<R, V, T>(
    task: T,
    buffer: usize,
) -> (StreamingTaskWrapper<R, V, T>, TaskResult<V>)
where
    R: Send + Sync + 'static,
    V: Send + 'static,
    T: StreamingTask<R, V>,
{
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let outcome: OutcomeSlot = Arc::new(OnceLock::new());

    let wrapper = StreamingTaskWrapper {
        task,
        tx,
        outcome: Arc::clone(&outcome),
        _resource: std::marker::PhantomData,
    };
    let result = TaskResult {
        receiver: rx,
        outcome,
    };

    (wrapper, result)
}

/// Adapts a [`Task`] into the valueless queue shape.
pub(crate) struct TaskWrapper<R, V, T> {
    task: T,
    tx: mpsc::Sender<V>,
    outcome: OutcomeSlot,
    _resource: std::marker::PhantomData<fn(R)>,
}

#[async_trait]
impl<R, V, T> ValuelessTask<R> for TaskWrapper<R, V, T>
where
    R: Send + Sync + 'static,
    V: Send + 'static,
    T: Task<R, V>,
{
    async fn execute(self: Box<Self>, ctx: Context, resource: Arc<R>) {
        let this = *self;

        match Box::new(this.task).execute(ctx, resource).await {
            Ok(value) => {
                let _ = this.outcome.set(Ok(()));
                // Capacity 1 and a single send: never blocks. A send error
                // just means the caller stopped listening.
                let _ = this.tx.try_send(value);
            }
            Err(err) => {
                let _ = this.outcome.set(Err(err));
            }
        }
        // this.tx drops here: the channel closes after the outcome is set.
    }
}

/// Adapts a [`StreamingTask`] into the valueless queue shape.
pub(crate) struct StreamingTaskWrapper<R, V, T> {
    task: T,
    tx: mpsc::Sender<V>,
    outcome: OutcomeSlot,
    _resource: std::marker::PhantomData<fn(R)>,
}

#[async_trait]
impl<R, V, T> ValuelessTask<R> for StreamingTaskWrapper<R, V, T>
where
    R: Send + Sync + 'static,
    V: Send + 'static,
    T: StreamingTask<R, V>,
{
    async fn execute(self: Box<Self>, ctx: Context, resource: Arc<R>) {
        let this = *self;

        let emitter = Emitter::new(this.tx.clone());
        let result = Box::new(this.task).execute(ctx, resource, emitter).await;

        let _ = this.outcome.set(result);
        // this.tx drops here: the channel closes after the outcome is set.
    }
}
