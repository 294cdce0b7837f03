//! # Submit helpers: wrap, enqueue, and collect with correct cancellation.
//!
//! These free functions are the recommended way to run [`Task`]s and
//! [`StreamingTask`]s on a [`WorkerPool`]. They wire up the result channel,
//! the terminal-error slot, and the cancellation plumbing that is easy to
//! get wrong by hand:
//!
//! ```text
//! submit ───────────► wrap ─► enqueue ─► race ctx | recv ─► drain ─► value
//! submit_streaming ─► wrap ─► enqueue ─► per-value callback loop ─► drain
//!                              └── child context, cancelled on exit ──┘
//! ```
//!
//! ## Error preference
//! - `submit`: a task error is returned ahead of the produced value.
//! - `submit_streaming*`: the callback's error is preferred over the task's
//!   (the callback refused to keep consuming; the task's later error is
//!   less informative). [`TaskError::Stop`] from the callback means
//!   successful early termination and is never surfaced.

use std::future::Future;

use crate::context::Context;
use crate::error::TaskError;
use crate::pool::pool::WorkerPool;
use crate::pool::task::{wrap_streaming_task, wrap_task, StreamingTask, Task, TaskResult};

/// Submits a [`Task`] and waits for its value.
///
/// Returns the cancellation cause if `ctx` cancels before the value is
/// received; the abandoned [`TaskResult`] is dropped and the task's output,
/// if any, goes unobserved.
///
/// # Panics
/// Panics if the pool has been closed, like [`WorkerPool::submit`].
pub async fn submit<R, V, T>(
    ctx: &Context,
    pool: &WorkerPool<R>,
    task: T,
) -> Result<V, TaskError>
where
    R: Send + Sync + 'static,
    V: Send + 'static,
    T: Task<R, V>,
{
    if let Some(cause) = ctx.cause() {
        return Err(cause);
    }

    let (wrapper, mut result) = wrap_task(task);
    pool.submit(ctx, wrapper).await?;

    tokio::select! {
        _ = ctx.cancelled() => Err(ctx.cause().unwrap_or(TaskError::Canceled)),
        value = result.recv() => {
            // Drain before touching the value: the terminal error wins.
            result.drain().await?;
            value.ok_or_else(|| TaskError::fail("task finished without producing a value"))
        }
    }
}

/// Submits a valueless function task and returns its error.
pub async fn submit_func<R, T>(ctx: &Context, pool: &WorkerPool<R>, task: T) -> Result<(), TaskError>
where
    R: Send + Sync + 'static,
    T: Task<R, ()>,
{
    submit(ctx, pool, task).await
}

/// Submits a [`StreamingTask`] and invokes `callback` for each value, with
/// a result buffer of 1.
pub async fn submit_streaming<R, V, T, F, Fut>(
    ctx: &Context,
    pool: &WorkerPool<R>,
    task: T,
    callback: F,
) -> Result<(), TaskError>
where
    R: Send + Sync + 'static,
    V: Send + 'static,
    T: StreamingTask<R, V>,
    F: FnMut(Context, V) -> Fut + Send,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    submit_streaming_buffered(ctx, pool, task, 1, callback).await
}

/// Submits a [`StreamingTask`] and invokes `callback` for each value as it
/// is produced.
///
/// A child context is derived for the task and the callback loop; a
/// callback error cancels it with that error as the cause, which is how a
/// refusing consumer stops a running producer without touching the caller's
/// context. The child is always cancelled on exit, so no task or context
/// outlives this call's observation.
///
/// Returning [`TaskError::Stop`] from the callback ends iteration and
/// reports success. Otherwise the callback's error is preferred over the
/// task's terminal error.
pub async fn submit_streaming_buffered<R, V, T, F, Fut>(
    ctx: &Context,
    pool: &WorkerPool<R>,
    task: T,
    buffer: usize,
    mut callback: F,
) -> Result<(), TaskError>
where
    R: Send + Sync + 'static,
    V: Send + 'static,
    T: StreamingTask<R, V>,
    F: FnMut(Context, V) -> Fut + Send,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    if let Some(cause) = ctx.cause() {
        return Err(cause);
    }

    let child = ctx.child();
    let _guard = child.clone().drop_guard();

    let (wrapper, mut result) = wrap_streaming_task(task, buffer);
    pool.submit(&child, wrapper).await?;

    let callback_err = callback_loop(&child, &mut result, &mut callback)
        .await
        .err();
    if let Some(err) = &callback_err {
        // Stop the task; the cause travels unchanged to its emit calls.
        child.cancel(err.clone());
    }
    let task_err = result.drain().await.err();

    let callback_err = callback_err.filter(|e| !e.is_stop());
    let task_err = task_err.filter(|e| !e.is_stop());

    match callback_err.or(task_err) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Submits a [`StreamingTask`] and collects every value into a `Vec`.
///
/// On error the collected values are discarded. Handy for tests and
/// demonstrations; prefer [`submit_streaming`] when results should be
/// consumed as they are produced.
pub async fn submit_streaming_collect_all<R, V, T>(
    ctx: &Context,
    pool: &WorkerPool<R>,
    task: T,
) -> Result<Vec<V>, TaskError>
where
    R: Send + Sync + 'static,
    V: Send + 'static,
    T: StreamingTask<R, V>,
{
    let mut values = Vec::new();
    submit_streaming(ctx, pool, task, |_ctx, value| {
        values.push(value);
        std::future::ready(Ok(()))
    })
    .await?;

    Ok(values)
}

/// Consumes the result stream, invoking the callback per value, until the
/// stream ends, the context cancels, or the callback errors.
async fn callback_loop<V, F, Fut>(
    ctx: &Context,
    result: &mut TaskResult<V>,
    callback: &mut F,
) -> Result<(), TaskError>
where
    F: FnMut(Context, V) -> Fut + Send,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    loop {
        tokio::select! {
            _ = ctx.cancelled() => return Err(ctx.cause().unwrap_or(TaskError::Canceled)),
            value = result.recv() => match value {
                Some(value) => callback(ctx.clone(), value).await?,
                None => return Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::emitter::Emitter;

    fn letters() -> impl StreamingTask<(), &'static str> {
        |ctx: Context, _res: Arc<()>, emitter: Emitter<&'static str>| async move {
            for s in ["a", "b", "c"] {
                emitter.emit(&ctx, s).await?;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn submit_returns_the_value() {
        let pool = WorkerPool::new(21u32, 1);
        pool.start();

        let doubled = submit(&Context::background(), &pool, |_ctx, res: Arc<u32>| async move {
            Ok::<_, TaskError>(*res * 2)
        })
        .await;
        assert_eq!(doubled, Ok(42));

        pool.close().await;
    }

    #[tokio::test]
    async fn submit_prefers_task_error_over_value() {
        let pool = WorkerPool::new((), 1);
        pool.start();

        let res = submit(&Context::background(), &pool, |_ctx, _res: Arc<()>| async move {
            Err::<u32, _>(TaskError::fail("nope"))
        })
        .await;
        assert_eq!(res, Err(TaskError::fail("nope")));

        pool.close().await;
    }

    #[tokio::test]
    async fn submit_with_cancelled_context_never_runs_the_task() {
        let pool = WorkerPool::new((), 1);
        pool.start();

        let ran = Arc::new(AtomicU32::new(0));
        let ctx = Context::background().child();
        ctx.cancel(TaskError::fail("too late"));

        let observed = Arc::clone(&ran);
        let res = submit(&ctx, &pool, move |_ctx, _res: Arc<()>| async move {
            observed.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TaskError>(())
        })
        .await;
        assert_eq!(res, Err(TaskError::fail("too late")));

        pool.close().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_after_submit_returns_cause() {
        let pool = WorkerPool::new((), 1);
        pool.start();

        let ctx = Context::background().child();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel(TaskError::fail("moved on"));
        });

        let res = submit(&ctx, &pool, |_ctx: Context, _res: Arc<()>| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<u32, TaskError>(7)
        })
        .await;
        assert_eq!(res, Err(TaskError::fail("moved on")));

        pool.close().await;
    }

    #[tokio::test]
    async fn streaming_collect_all_in_order() {
        let pool = WorkerPool::new((), 1);
        pool.start();

        let values = submit_streaming_collect_all(&Context::background(), &pool, letters())
            .await
            .expect("collect");
        assert_eq!(values, vec!["a", "b", "c"]);

        pool.close().await;
    }

    #[tokio::test]
    async fn stop_ends_iteration_without_error() {
        let pool = WorkerPool::new((), 1);
        pool.start();

        let seen = Arc::new(AtomicU32::new(0));
        let counting = Arc::clone(&seen);
        let res = submit_streaming(
            &Context::background(),
            &pool,
            |ctx: Context, _res: Arc<()>, emitter: Emitter<u32>| async move {
                for i in 0.. {
                    emitter.emit(&ctx, i).await?;
                }
                Ok(())
            },
            move |_ctx, _value| {
                let n = counting.fetch_add(1, Ordering::SeqCst) + 1;
                std::future::ready(if n >= 2 { Err(TaskError::Stop) } else { Ok(()) })
            },
        )
        .await;

        assert_eq!(res, Ok(()));
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        pool.close().await;
    }

    #[tokio::test]
    async fn callback_error_cancels_the_task_and_wins() {
        let pool = WorkerPool::new((), 1);
        pool.start();

        let res = submit_streaming(
            &Context::background(),
            &pool,
            |ctx: Context, _res: Arc<()>, emitter: Emitter<u32>| async move {
                for i in 0.. {
                    emitter.emit(&ctx, i).await?;
                }
                Ok(())
            },
            |_ctx, value| {
                std::future::ready(if value >= 1 {
                    Err(TaskError::fail("enough"))
                } else {
                    Ok(())
                })
            },
        )
        .await;

        assert_eq!(res, Err(TaskError::fail("enough")));

        pool.close().await;
    }

    #[tokio::test]
    async fn task_error_surfaces_when_callback_is_clean() {
        let pool = WorkerPool::new((), 1);
        pool.start();

        let res = submit_streaming(
            &Context::background(),
            &pool,
            |ctx: Context, _res: Arc<()>, emitter: Emitter<u32>| async move {
                emitter.emit(&ctx, 1).await?;
                Err(TaskError::fail("producer broke"))
            },
            |_ctx, _value| std::future::ready(Ok(())),
        )
        .await;

        assert_eq!(res, Err(TaskError::fail("producer broke")));

        pool.close().await;
    }

    #[tokio::test]
    async fn slow_callback_applies_back_pressure() {
        let pool = WorkerPool::new((), 1);
        pool.start();

        let emitted = Arc::new(AtomicU32::new(0));
        let progress = Arc::clone(&emitted);
        let res = submit_streaming(
            &Context::background(),
            &pool,
            move |ctx: Context, _res: Arc<()>, emitter: Emitter<u32>| async move {
                for i in 0..4 {
                    emitter.emit(&ctx, i).await?;
                    progress.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            },
            |_ctx, value: u32| {
                let emitted = Arc::clone(&emitted);
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    // Buffer of 1: the producer can be at most two emissions
                    // past the value the callback is holding.
                    assert!(emitted.load(Ordering::SeqCst) <= value + 2);
                    Ok(())
                }
            },
        )
        .await;

        assert_eq!(res, Ok(()));
        pool.close().await;
    }

    #[tokio::test]
    async fn submit_func_returns_only_the_error() {
        let pool = WorkerPool::new((), 1);
        pool.start();

        let ok = submit_func(&Context::background(), &pool, |_ctx, _res: Arc<()>| async {
            Ok::<_, TaskError>(())
        })
        .await;
        assert_eq!(ok, Ok(()));

        let err = submit_func(&Context::background(), &pool, |_ctx, _res: Arc<()>| async {
            Err(TaskError::fail("fire and forget, but broken"))
        })
        .await;
        assert_eq!(err, Err(TaskError::fail("fire and forget, but broken")));

        pool.close().await;
    }
}
