use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::error::TaskError;
use crate::eventloop::event::Event;
use crate::eventloop::snapshot::StateSnapshot;
use crate::pool::{ValuelessTask, WorkerPool};
use crate::sync::ContextLock;

/// Monotonic identity of an event-loop state version.
pub type GenerationID = u64;

/// Where the current snapshot lives: the one-worker pool's shared resource.
/// Read-mostly, written only by the loop worker, never held across await.
pub(crate) type SnapshotCell<S> = RwLock<Arc<StateSnapshot<S>>>;

/// Serial dispatcher of [`Event`]s over versioned [`StateSnapshot`]s.
///
/// Built from the crate's own parts: a 1-worker [`WorkerPool`] whose shared
/// resource is the snapshot cell, and a [`ContextLock`] that keeps the
/// generation a `send` returns aligned with the order events reach the
/// queue.
pub struct EventLoop<S> {
    pool: WorkerPool<SnapshotCell<S>>,
    generation: AtomicU64,
    send_lock: ContextLock,
    done: CancellationToken,
}

impl<S: Clone + Send + Sync + 'static> EventLoop<S> {
    /// Creates (but does not start) a loop with no event buffering beyond
    /// the single in-flight event a bounded tokio channel holds.
    pub fn new(initial: StateSnapshot<S>) -> Self {
        Self::new_buffered(initial, 0)
    }

    /// Creates (but does not start) a loop whose event queue holds up to
    /// `buffer` pending events.
    ///
    /// The generation counter seeds from `initial.generation()`.
    pub fn new_buffered(initial: StateSnapshot<S>, buffer: usize) -> Self {
        let base = initial.generation();
        let cell = RwLock::new(Arc::new(initial));

        Self {
            pool: WorkerPool::new_buffered(cell, 1, buffer),
            generation: AtomicU64::new(base),
            send_lock: ContextLock::new(),
            done: CancellationToken::new(),
        }
    }

    /// Starts the loop worker.
    ///
    /// # Panics
    /// Panics if the loop has already been started.
    pub fn start(&self) {
        self.pool.start();
    }

    /// Closes the event queue, waits for queued events to dispatch, then
    /// fires the done signal. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
        self.done.cancel();
    }

    /// Completion signal: cancelled once the loop has closed and every
    /// queued event has been dispatched.
    pub fn done(&self) -> CancellationToken {
        self.done.clone()
    }

    /// Enqueues an event and returns the generation its snapshot will
    /// carry.
    ///
    /// Returns the cancellation cause if `ctx` cancels before the event is
    /// accepted; the counter is untouched in that case.
    ///
    /// # Panics
    /// Panics if the loop has been closed, like [`WorkerPool::submit`].
    pub async fn send(
        &self,
        ctx: &Context,
        event: impl Event<S>,
    ) -> Result<GenerationID, TaskError> {
        if let Some(cause) = ctx.cause() {
            return Err(cause);
        }

        // The lock spans enqueue + increment so that generation order,
        // queue order, and dispatch order all agree.
        let _guard = self.send_lock.acquire(ctx).await?;

        self.pool
            .submit(ctx, EventTask { event: Box::new(event) })
            .await?;

        Ok(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The current snapshot. Immutable; `state()` on it is a clone.
    pub fn snapshot(&self) -> Arc<StateSnapshot<S>> {
        load(&self.cell())
    }

    /// Shared handle on the snapshot cell, for spawned observers.
    pub(crate) fn cell(&self) -> Arc<SnapshotCell<S>> {
        self.pool.resource()
    }
}

/// Reads the current snapshot out of a cell handle.
pub(crate) fn load<S>(cell: &SnapshotCell<S>) -> Arc<StateSnapshot<S>> {
    Arc::clone(&cell.read().expect("snapshot cell lock"))
}

/// Adapts an [`Event`] into the pool's queue shape.
struct EventTask<S> {
    event: Box<dyn Event<S>>,
}

#[async_trait]
impl<S: Clone + Send + Sync + 'static> ValuelessTask<SnapshotCell<S>> for EventTask<S> {
    async fn execute(self: Box<Self>, _ctx: Context, cell: Arc<SnapshotCell<S>>) {
        let current = Arc::clone(&cell.read().expect("snapshot cell lock"));

        let state = self.event.dispatch(current.generation() + 1, current.state());
        let next = Arc::new(current.next(state));

        // Store before expire: an observer woken by the expiration that
        // re-reads the cell must see the successor.
        *cell.write().expect("snapshot cell lock") = next;
        current.expire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_returns_consecutive_generations() {
        let el = EventLoop::new_buffered(StateSnapshot::new(0u64), 10);
        el.start();

        let ctx = Context::background();
        for expected in 1..=5u64 {
            let gen = el.send(&ctx, |_gen, count: u64| count + 1).await.expect("send");
            assert_eq!(gen, expected);
        }

        el.close().await;
        let snap = el.snapshot();
        assert_eq!(snap.generation(), 5);
        assert_eq!(snap.state(), 5);
    }

    #[tokio::test]
    async fn dispatch_sees_the_generation_it_produces() {
        let el = EventLoop::new(StateSnapshot::new(0u64));
        el.start();

        let ctx = Context::background();
        let gen = el
            .send(&ctx, |gen, _count: u64| gen)
            .await
            .expect("send");
        assert_eq!(gen, 1);

        el.close().await;
        assert_eq!(el.snapshot().state(), 1);
    }

    #[tokio::test]
    async fn counter_seeds_from_the_initial_snapshot() {
        let el = EventLoop::new(StateSnapshot::with_generation(0u64, 7));
        el.start();

        let ctx = Context::background();
        let gen = el.send(&ctx, |_gen, count: u64| count + 1).await.expect("send");
        assert_eq!(gen, 8);

        el.close().await;
        assert_eq!(el.snapshot().generation(), 8);
    }

    #[tokio::test]
    async fn events_dispatch_in_send_order() {
        let el = EventLoop::new_buffered(StateSnapshot::new(Vec::<u64>::new()), 8);
        el.start();

        let ctx = Context::background();
        for _ in 0..5 {
            el.send(&ctx, |gen, mut order: Vec<u64>| {
                order.push(gen);
                order
            })
            .await
            .expect("send");
        }

        el.close().await;
        assert_eq!(el.snapshot().state(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn send_with_cancelled_context_returns_cause() {
        let el = EventLoop::new(StateSnapshot::new(0u64));
        el.start();

        let ctx = Context::background().child();
        ctx.cancel(TaskError::fail("no thanks"));

        let err = el
            .send(&ctx, |_gen, count: u64| count + 1)
            .await
            .expect_err("send must fail");
        assert_eq!(err, TaskError::fail("no thanks"));

        el.close().await;
        assert_eq!(el.snapshot().generation(), 0);
    }

    #[tokio::test]
    async fn close_before_start_fires_done() {
        let el = EventLoop::new(StateSnapshot::new(0u64));
        el.close().await;
        el.done().cancelled().await;
    }

    #[tokio::test]
    async fn predecessor_expires_after_successor_is_stored() {
        let el = EventLoop::new(StateSnapshot::new(0u64));
        el.start();

        let ctx = Context::background();
        let first = el.snapshot();
        el.send(&ctx, |_gen, count: u64| count + 1).await.expect("send");

        first.expired().await;
        let successor = el.snapshot();
        assert_eq!(successor.generation(), 1);
        assert_eq!(successor.state(), 1);

        el.close().await;
    }
}
